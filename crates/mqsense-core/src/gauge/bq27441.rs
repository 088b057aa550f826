use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, info, warn};

use super::{BatteryGauge, BatteryStatus, GaugeError};
use crate::config::GaugeCalibration;
use crate::time::delay_for;

// =============================================================================
// I2C Address
// =============================================================================

/// BQ27441 I2C address
pub const I2C_ADDR: u8 = 0x55;

// =============================================================================
// Standard Commands
// =============================================================================

const CMD_CONTROL: u8 = 0x00;
const CMD_VOLTAGE: u8 = 0x04;
const CMD_FLAGS: u8 = 0x06;
const CMD_REMAINING_CAPACITY: u8 = 0x0C;
const CMD_FULL_CHARGE_CAPACITY: u8 = 0x0E;
const CMD_AVERAGE_CURRENT: u8 = 0x10;
const CMD_AVERAGE_POWER: u8 = 0x18;
const CMD_STATE_OF_CHARGE: u8 = 0x1C;
const CMD_STATE_OF_HEALTH: u8 = 0x20;

// =============================================================================
// Extended Data Commands
// =============================================================================

const EXT_DATA_CLASS: u8 = 0x3E;
const EXT_DATA_BLOCK: u8 = 0x3F;
const EXT_BLOCK_DATA: u8 = 0x40;
const EXT_BLOCK_CHECKSUM: u8 = 0x60;
const EXT_BLOCK_DATA_CONTROL: u8 = 0x61;

const BLOCK_SIZE: usize = 32;

// =============================================================================
// Control Subcommands
// =============================================================================

const CONTROL_STATUS: u16 = 0x0000;
const CONTROL_SET_CFGUPDATE: u16 = 0x0013;
const CONTROL_SEALED: u16 = 0x0020;
const CONTROL_SOFT_RESET: u16 = 0x0042;
const UNSEAL_KEY: u16 = 0x8000;

// =============================================================================
// Status Bits
// =============================================================================

/// Flags(): POR or RESET occurred, RAM configuration is back to defaults
const FLAG_ITPOR: u16 = 1 << 5;
/// Flags(): gauge is in config update mode
const FLAG_CFGUPMODE: u16 = 1 << 4;
/// CONTROL_STATUS: gauge is sealed
const STATUS_SEALED: u16 = 1 << 13;

// =============================================================================
// State Subclass (data memory, big-endian)
// =============================================================================

const STATE_SUBCLASS: u8 = 82;
const OFFSET_DESIGN_CAPACITY: u8 = 10;
const OFFSET_DESIGN_ENERGY: u8 = 12;
const OFFSET_TERMINATE_VOLTAGE: u8 = 16;
const OFFSET_TAPER_RATE: u8 = 27;

const MODE_POLL_ATTEMPTS: usize = 20;
const MODE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// TI BQ27441 fuel gauge.
pub struct Bq27441 {
    address: u8,
}

impl Default for Bq27441 {
    fn default() -> Self {
        Self::new()
    }
}

impl Bq27441 {
    pub const fn new() -> Self {
        Self { address: I2C_ADDR }
    }

    /// Whether the gauge lost its RAM configuration (POR or reset since last config).
    pub async fn needs_configuration<I: I2c>(&self, i2c: &mut I) -> Result<bool, GaugeError> {
        Ok(self.read_word(i2c, CMD_FLAGS).await? & FLAG_ITPOR != 0)
    }

    /// Write capacity, design energy, terminate voltage and taper rate.
    ///
    /// Leaves config mode and restores the seal even when a write fails.
    pub async fn configure<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
        calibration: &GaugeCalibration,
    ) -> Result<(), GaugeError> {
        info!(
            "Writing gauge config: {} mAh, {} mV terminate, taper rate {}",
            calibration.design_capacity_mah,
            calibration.terminate_voltage_mv,
            calibration.taper_rate()
        );

        let was_sealed = self.control_read(i2c, CONTROL_STATUS).await? & STATUS_SEALED != 0;
        if was_sealed {
            self.control(i2c, UNSEAL_KEY).await?;
            self.control(i2c, UNSEAL_KEY).await?;
        }

        let result = match self.enter_config(i2c, delay).await {
            Ok(()) => {
                let written = self.write_state(i2c, calibration).await;
                let exited = self.exit_config(i2c, delay).await;
                written.and(exited)
            }
            Err(e) => Err(e),
        };

        if was_sealed {
            self.control(i2c, CONTROL_SEALED).await?;
        }

        match &result {
            Ok(()) => info!("Gauge config written"),
            Err(e) => warn!("Gauge config failed: {}", e),
        }
        result
    }

    async fn write_state<I: I2c>(
        &self,
        i2c: &mut I,
        calibration: &GaugeCalibration,
    ) -> Result<(), GaugeError> {
        let fields = [
            (OFFSET_DESIGN_CAPACITY, calibration.design_capacity_mah),
            (OFFSET_DESIGN_ENERGY, calibration.design_energy_mwh()),
            (OFFSET_TERMINATE_VOLTAGE, calibration.terminate_voltage_mv),
            (OFFSET_TAPER_RATE, calibration.taper_rate()),
        ];

        for (offset, value) in fields {
            self.write_extended(i2c, STATE_SUBCLASS, offset, value.to_be_bytes())
                .await?;
        }
        Ok(())
    }

    async fn enter_config<I: I2c, D: DelayNs>(
        &self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), GaugeError> {
        self.control(i2c, CONTROL_SET_CFGUPDATE).await?;
        self.wait_for_flag(i2c, delay, FLAG_CFGUPMODE, true, "config update mode")
            .await
    }

    async fn exit_config<I: I2c, D: DelayNs>(
        &self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), GaugeError> {
        self.control(i2c, CONTROL_SOFT_RESET).await?;
        self.wait_for_flag(i2c, delay, FLAG_CFGUPMODE, false, "config update exit")
            .await
    }

    async fn wait_for_flag<I: I2c, D: DelayNs>(
        &self,
        i2c: &mut I,
        delay: &mut D,
        mask: u16,
        set: bool,
        what: &'static str,
    ) -> Result<(), GaugeError> {
        for _ in 0..MODE_POLL_ATTEMPTS {
            let flags = self.read_word(i2c, CMD_FLAGS).await?;
            if (flags & mask != 0) == set {
                return Ok(());
            }
            delay_for(delay, MODE_POLL_INTERVAL).await;
        }
        Err(GaugeError::Timeout(what))
    }

    /// Write two bytes at `offset` of a data memory subclass and commit with a new checksum.
    async fn write_extended<I: I2c>(
        &self,
        i2c: &mut I,
        class: u8,
        offset: u8,
        data: [u8; 2],
    ) -> Result<(), GaugeError> {
        self.write_register(i2c, EXT_BLOCK_DATA_CONTROL, 0x00).await?;
        self.write_register(i2c, EXT_DATA_CLASS, class).await?;
        self.write_register(i2c, EXT_DATA_BLOCK, offset / BLOCK_SIZE as u8)
            .await?;

        let register = EXT_BLOCK_DATA + offset % BLOCK_SIZE as u8;
        i2c.write(self.address, &[register, data[0], data[1]])
            .await
            .map_err(GaugeError::from_bus)?;

        let checksum = self.block_checksum(i2c).await?;
        debug!(
            "Gauge class {} offset {} <- {:02x}{:02x}, checksum {:02x}",
            class, offset, data[0], data[1], checksum
        );
        self.write_register(i2c, EXT_BLOCK_CHECKSUM, checksum).await
    }

    async fn block_checksum<I: I2c>(&self, i2c: &mut I) -> Result<u8, GaugeError> {
        let mut block = [0u8; BLOCK_SIZE];
        i2c.write_read(self.address, &[EXT_BLOCK_DATA], &mut block)
            .await
            .map_err(GaugeError::from_bus)?;
        let sum = block.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        Ok(0xFF - sum)
    }

    async fn control<I: I2c>(&self, i2c: &mut I, subcommand: u16) -> Result<(), GaugeError> {
        let [lo, hi] = subcommand.to_le_bytes();
        i2c.write(self.address, &[CMD_CONTROL, lo, hi])
            .await
            .map_err(GaugeError::from_bus)
    }

    async fn control_read<I: I2c>(&self, i2c: &mut I, subcommand: u16) -> Result<u16, GaugeError> {
        self.control(i2c, subcommand).await?;
        self.read_word(i2c, CMD_CONTROL).await
    }

    async fn write_register<I: I2c>(
        &self,
        i2c: &mut I,
        register: u8,
        value: u8,
    ) -> Result<(), GaugeError> {
        i2c.write(self.address, &[register, value])
            .await
            .map_err(GaugeError::from_bus)
    }

    async fn read_word<I: I2c>(&self, i2c: &mut I, command: u8) -> Result<u16, GaugeError> {
        let mut buf = [0u8; 2];
        i2c.write_read(self.address, &[command], &mut buf)
            .await
            .map_err(GaugeError::from_bus)?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl BatteryGauge for Bq27441 {
    async fn read_status<I: I2c>(&mut self, i2c: &mut I) -> Result<BatteryStatus, GaugeError> {
        let status = BatteryStatus {
            soc_percent: self.read_word(i2c, CMD_STATE_OF_CHARGE).await?,
            voltage_mv: self.read_word(i2c, CMD_VOLTAGE).await?,
            current_ma: self.read_word(i2c, CMD_AVERAGE_CURRENT).await? as i16,
            remaining_capacity_mah: self.read_word(i2c, CMD_REMAINING_CAPACITY).await?,
            full_capacity_mah: self.read_word(i2c, CMD_FULL_CHARGE_CAPACITY).await?,
            power_mw: self.read_word(i2c, CMD_AVERAGE_POWER).await? as i16,
            // High byte is the SOH status, low byte the percentage
            soh_percent: (self.read_word(i2c, CMD_STATE_OF_HEALTH).await? & 0xFF) as u8,
        };

        debug!(
            "{}% | {} mV | {} mA | {} / {} mAh | {} mW | {}%",
            status.soc_percent,
            status.voltage_mv,
            status.current_ma,
            status.remaining_capacity_mah,
            status.full_capacity_mah,
            status.power_mw,
            status.soh_percent
        );
        Ok(status)
    }
}
