//! Sensirion SHT31 temperature and humidity sensor over `sensirion-i2c`

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::info;

use super::sensirion::{read_words, write_command};
use super::{ReadError, Sensor, SleepError, WakeError, command_delay};
use crate::reading::{Channels, SensorId};

/// SHT31 I2C address (ADDR pin low)
pub const I2C_ADDR: u8 = 0x44;

const CMD_READ_STATUS: u16 = 0xF32D;
const CMD_HEATER_DISABLE: u16 = 0x3066;
/// Single shot, high repeatability, no clock stretching
const CMD_MEASURE_SINGLE_SHOT: u16 = 0x2400;

const STATUS_HEATER_ON: u16 = 1 << 13;

const MEASUREMENT_DURATION: Duration = Duration::from_millis(16);
const COMMAND_DURATION: Duration = Duration::from_millis(1);

/// SHT31 in single-shot mode. It idles between measurements, so sleeping is a no-op.
pub struct Sht31 {
    address: u8,
}

impl Default for Sht31 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sht31 {
    pub const fn new() -> Self {
        Self { address: I2C_ADDR }
    }
}

impl Sensor for Sht31 {
    fn id(&self) -> SensorId {
        SensorId::Climate
    }

    async fn wake<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), WakeError> {
        write_command(i2c, self.address, CMD_READ_STATUS)
            .await
            .map_err(WakeError::from_bus)?;
        let mut status = [0u16; 1];
        read_words(i2c, self.address, &mut status).await?;

        if status[0] & STATUS_HEATER_ON != 0 {
            info!("SHT31 heater is on, disabling");
            write_command(i2c, self.address, CMD_HEATER_DISABLE)
                .await
                .map_err(WakeError::from_bus)?;
            command_delay(delay, COMMAND_DURATION).await;
        }
        Ok(())
    }

    async fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<Channels, ReadError> {
        write_command(i2c, self.address, CMD_MEASURE_SINGLE_SHOT)
            .await
            .map_err(ReadError::from_bus)?;
        command_delay(delay, MEASUREMENT_DURATION).await;

        // Without clock stretching the sensor NACKs the read until the measurement is done.
        let mut words = [0u16; 2];
        read_words(i2c, self.address, &mut words)
            .await
            .map_err(|e| match e {
                ReadError::NoAck => ReadError::NotReady,
                other => other,
            })?;

        let mut channels = Channels::new();
        for value in [temperature_celsius(words[0]), humidity_percent(words[1])] {
            channels
                .push(value)
                .map_err(|_| ReadError::InvalidSample("too many channels"))?;
        }
        Ok(channels)
    }

    async fn sleep<I: I2c, D: DelayNs>(
        &mut self,
        _i2c: &mut I,
        _delay: &mut D,
    ) -> Result<(), SleepError> {
        Ok(())
    }
}

fn temperature_celsius(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / 65535.0
}

fn humidity_percent(raw: u16) -> f32 {
    100.0 * f32::from(raw) / 65535.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ScriptedI2c, SimTimebase, Step};
    use crate::sensors::sensirion::encode_words;
    use embassy_futures::block_on;

    #[test]
    fn test_wake_disables_heater_when_on() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack)
            .push(Step::Read(encode_words(&[0x8010 | STATUS_HEATER_ON])));
        let mut time = SimTimebase::new();

        block_on(Sht31::new().wake(&mut i2c, &mut time)).unwrap();

        assert_eq!(i2c.commands(), vec![CMD_READ_STATUS, CMD_HEATER_DISABLE]);
    }

    #[test]
    fn test_wake_leaves_heater_alone_when_off() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack).push(Step::Read(encode_words(&[0x8010])));
        let mut time = SimTimebase::new();

        block_on(Sht31::new().wake(&mut i2c, &mut time)).unwrap();

        assert_eq!(i2c.commands(), vec![CMD_READ_STATUS]);
    }

    #[test]
    fn test_read_converts_raw_values() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack)
            .push(Step::Read(encode_words(&[0x6666, 0x8000])));
        let mut time = SimTimebase::new();

        let channels = block_on(Sht31::new().read(&mut i2c, &mut time)).unwrap();

        assert!((channels[0] - 25.0).abs() < 0.01);
        assert!((channels[1] - 50.0).abs() < 0.01);
        assert_eq!(time.delays_ms(), &[16]);
    }

    #[test]
    fn test_read_nack_means_not_ready() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack).push(Step::Nack);
        let mut time = SimTimebase::new();

        assert_eq!(
            block_on(Sht31::new().read(&mut i2c, &mut time)),
            Err(ReadError::NotReady)
        );
    }

    #[test]
    fn test_absent_sensor_is_no_ack() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Nack);
        let mut time = SimTimebase::new();

        assert_eq!(
            block_on(Sht31::new().read(&mut i2c, &mut time)),
            Err(ReadError::NoAck)
        );
    }
}
