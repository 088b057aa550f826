//! Sensirion SPS30 particulate matter sensor
//!
//! Command set written here; word framing and CRC come from `sensirion-i2c`.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::debug;

use super::sensirion::{read_words, write_command, write_command_with_arg};
use super::{ReadError, Sensor, SleepError, WakeError, command_delay};
use crate::reading::{Channels, SensorId};

/// SPS30 I2C address
pub const I2C_ADDR: u8 = 0x69;

const CMD_START_MEASUREMENT: u16 = 0x0010;
const CMD_STOP_MEASUREMENT: u16 = 0x0104;
const CMD_READ_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASURED_VALUES: u16 = 0x0300;
const CMD_SLEEP: u16 = 0x1001;
const CMD_WAKE_UP: u16 = 0x1103;

/// Start-measurement argument selecting big-endian IEEE754 float output
const OUTPUT_FORMAT_FLOAT: u16 = 0x0300;

const START_STOP_DELAY: Duration = Duration::from_millis(20);
const SLEEP_WAKE_DELAY: Duration = Duration::from_millis(5);

/// PM1.0, PM2.5, PM4.0 and PM10 mass concentrations, two words each.
const MASS_CONCENTRATION_WORDS: usize = 8;

/// SPS30 in float output mode, reporting mass concentrations in ug/m3.
pub struct Sps30 {
    address: u8,
}

impl Default for Sps30 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sps30 {
    pub const fn new() -> Self {
        Self { address: I2C_ADDR }
    }
}

impl Sensor for Sps30 {
    fn id(&self) -> SensorId {
        SensorId::ParticulateMatter
    }

    async fn wake<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), WakeError> {
        // In sleep mode the interface is off; the first wake-up is NACKed and only
        // powers it up. The second one is the real command.
        let _ = write_command(i2c, self.address, CMD_WAKE_UP).await;
        write_command(i2c, self.address, CMD_WAKE_UP)
            .await
            .map_err(WakeError::from_bus)?;
        command_delay(delay, SLEEP_WAKE_DELAY).await;

        write_command_with_arg(i2c, self.address, CMD_START_MEASUREMENT, OUTPUT_FORMAT_FLOAT)
            .await
            .map_err(WakeError::from_bus)?;
        command_delay(delay, START_STOP_DELAY).await;

        debug!("SPS30 measuring");
        Ok(())
    }

    async fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        _delay: &mut D,
    ) -> Result<Channels, ReadError> {
        write_command(i2c, self.address, CMD_READ_DATA_READY)
            .await
            .map_err(ReadError::from_bus)?;
        let mut ready = [0u16; 1];
        read_words(i2c, self.address, &mut ready).await?;
        if ready[0] == 0 {
            return Err(ReadError::NotReady);
        }

        write_command(i2c, self.address, CMD_READ_MEASURED_VALUES)
            .await
            .map_err(ReadError::from_bus)?;
        let mut words = [0u16; MASS_CONCENTRATION_WORDS];
        read_words(i2c, self.address, &mut words).await?;

        decode_mass_concentrations(&words)
    }

    async fn sleep<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<(), SleepError> {
        write_command(i2c, self.address, CMD_STOP_MEASUREMENT)
            .await
            .map_err(SleepError::from_bus)?;
        command_delay(delay, START_STOP_DELAY).await;

        write_command(i2c, self.address, CMD_SLEEP)
            .await
            .map_err(SleepError::from_bus)?;
        command_delay(delay, SLEEP_WAKE_DELAY).await;
        Ok(())
    }
}

fn decode_mass_concentrations(words: &[u16]) -> Result<Channels, ReadError> {
    let mut channels = Channels::new();
    for pair in words.chunks_exact(2) {
        let value = f32::from_bits((u32::from(pair[0]) << 16) | u32::from(pair[1]));
        if !value.is_finite() || value < 0.0 {
            return Err(ReadError::InvalidSample("mass concentration out of range"));
        }
        channels
            .push(value)
            .map_err(|_| ReadError::InvalidSample("too many channels"))?;
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ScriptedI2c, SimTimebase, Step};
    use crate::sensors::sensirion::encode_words;
    use embassy_futures::block_on;

    fn float_words(values: &[f32]) -> Vec<u16> {
        values
            .iter()
            .flat_map(|v| {
                let bits = v.to_bits();
                [(bits >> 16) as u16, bits as u16]
            })
            .collect()
    }

    #[test]
    fn test_wake_tolerates_nack_on_first_wake_up() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Nack);
        let mut time = SimTimebase::new();

        block_on(Sps30::new().wake(&mut i2c, &mut time)).unwrap();

        assert_eq!(
            i2c.commands(),
            vec![CMD_WAKE_UP, CMD_WAKE_UP, CMD_START_MEASUREMENT]
        );
        assert_eq!(i2c.writes()[2].1[2..4], [0x03, 0x00]);
        assert_eq!(time.delays_ms(), &[5, 20]);
    }

    #[test]
    fn test_wake_fails_when_device_absent() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Nack).push(Step::Nack);
        let mut time = SimTimebase::new();

        assert_eq!(
            block_on(Sps30::new().wake(&mut i2c, &mut time)),
            Err(WakeError::NoAck)
        );
    }

    #[test]
    fn test_read_not_ready() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack).push(Step::Read(encode_words(&[0])));
        let mut time = SimTimebase::new();

        assert_eq!(
            block_on(Sps30::new().read(&mut i2c, &mut time)),
            Err(ReadError::NotReady)
        );
        assert_eq!(i2c.commands(), vec![CMD_READ_DATA_READY]);
    }

    #[test]
    fn test_read_mass_concentrations() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack)
            .push(Step::Read(encode_words(&[1])))
            .push(Step::Ack)
            .push(Step::Read(encode_words(&float_words(&[
                12.5, 20.25, 25.0, 30.0,
            ]))));
        let mut time = SimTimebase::new();

        let channels = block_on(Sps30::new().read(&mut i2c, &mut time)).unwrap();

        assert_eq!(channels.as_slice(), &[12.5, 20.25, 25.0, 30.0]);
        assert_eq!(
            i2c.commands(),
            vec![CMD_READ_DATA_READY, CMD_READ_MEASURED_VALUES]
        );
    }

    #[test]
    fn test_negative_concentration_is_invalid() {
        let mut i2c = ScriptedI2c::new();
        i2c.push(Step::Ack)
            .push(Step::Read(encode_words(&[1])))
            .push(Step::Ack)
            .push(Step::Read(encode_words(&float_words(&[
                1.0, -2.0, 3.0, 4.0,
            ]))));
        let mut time = SimTimebase::new();

        assert!(matches!(
            block_on(Sps30::new().read(&mut i2c, &mut time)),
            Err(ReadError::InvalidSample(_))
        ));
    }

    #[test]
    fn test_sleep_stops_then_sleeps() {
        let mut i2c = ScriptedI2c::new();
        let mut time = SimTimebase::new();

        block_on(Sps30::new().sleep(&mut i2c, &mut time)).unwrap();

        assert_eq!(i2c.commands(), vec![CMD_STOP_MEASUREMENT, CMD_SLEEP]);
        assert_eq!(time.delays_ms(), &[20, 5]);
    }
}
