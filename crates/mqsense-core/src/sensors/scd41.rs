//! Sensirion SCD41 CO2 sensor in periodic measurement mode
//!
//! Measurement commands go through `scd41-embedded`, built per call over the
//! lent bus and delay. Wake-up and power-down are sent as raw commands.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error};
use scd41_embedded::r#async::Scd41Async;

use super::sensirion::write_command;
use super::{ReadError, Sensor, SleepError, WakeError, command_delay};
use crate::reading::{Channels, SensorId};

/// SCD41 I2C address
pub const I2C_ADDR: u8 = 0x62;

const CMD_POWER_DOWN: u16 = 0x36E0;
const CMD_WAKE_UP: u16 = 0x36F6;

const WAKE_UP_DURATION: Duration = Duration::from_millis(30);
const STOP_DURATION: Duration = Duration::from_millis(500);
const COMMAND_DURATION: Duration = Duration::from_millis(1);

/// SCD41 reporting CO2 in ppm.
pub struct Scd41 {
    address: u8,
}

impl Default for Scd41 {
    fn default() -> Self {
        Self::new()
    }
}

impl Scd41 {
    pub const fn new() -> Self {
        Self { address: I2C_ADDR }
    }
}

impl Sensor for Scd41 {
    fn id(&self) -> SensorId {
        SensorId::CarbonDioxide
    }

    async fn wake<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), WakeError> {
        // Never acknowledged. The stop below is what confirms the sensor is awake.
        let _ = write_command(i2c, self.address, CMD_WAKE_UP).await;
        command_delay(delay, WAKE_UP_DURATION).await;

        // A sensor left measuring by a failed sleep refuses every other command.
        Scd41Async::new(&mut *i2c, &mut *delay)
            .stop_periodic_measurement()
            .await
            .map_err(|e| {
                error!("SCD41 stop_periodic_measurement failed: {:?}", e);
                WakeError::Bus
            })?;
        command_delay(delay, STOP_DURATION).await;

        let mut sensor = Scd41Async::new(&mut *i2c, &mut *delay);
        sensor
            .set_automatic_self_calibration(true)
            .await
            .map_err(|e| {
                error!("SCD41 set_automatic_self_calibration failed: {:?}", e);
                WakeError::Bus
            })?;
        sensor.start_periodic_measurement().await.map_err(|e| {
            error!("SCD41 start_periodic_measurement failed: {:?}", e);
            WakeError::Bus
        })?;

        debug!("SCD41 periodic measurement started");
        Ok(())
    }

    async fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<Channels, ReadError> {
        let mut sensor = Scd41Async::new(&mut *i2c, &mut *delay);

        let ready = sensor.data_ready().await.map_err(|e| {
            error!("SCD41 data_ready check failed: {:?}", e);
            ReadError::Bus
        })?;
        if !ready {
            return Err(ReadError::NotReady);
        }

        let measurement = sensor.measurement().await.map_err(|e| {
            error!("SCD41 measurement read failed: {:?}", e);
            ReadError::Bus
        })?;
        if measurement.co2_ppm == 0 {
            return Err(ReadError::InvalidSample("CO2 reading of 0 ppm"));
        }

        let mut channels = Channels::new();
        channels
            .push(measurement.co2_ppm as f32)
            .map_err(|_| ReadError::InvalidSample("too many channels"))?;
        Ok(channels)
    }

    async fn sleep<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), SleepError> {
        Scd41Async::new(&mut *i2c, &mut *delay)
            .stop_periodic_measurement()
            .await
            .map_err(|e| {
                error!("SCD41 stop_periodic_measurement failed: {:?}", e);
                SleepError::Bus
            })?;
        command_delay(delay, STOP_DURATION).await;

        write_command(i2c, self.address, CMD_POWER_DOWN)
            .await
            .map_err(SleepError::from_bus)?;
        command_delay(delay, COMMAND_DURATION).await;
        Ok(())
    }
}
