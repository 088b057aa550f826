//! Battery fuel gauge

mod bq27441;

use embedded_hal_async::i2c::I2c;
use thiserror_no_std::Error;

pub use bq27441::Bq27441;

/// Battery metrics shown next to the air-quality snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryStatus {
    pub soc_percent: u16,
    pub voltage_mv: u16,
    /// Average current, negative while discharging
    pub current_ma: i16,
    pub remaining_capacity_mah: u16,
    pub full_capacity_mah: u16,
    /// Average power, negative while discharging
    pub power_mw: i16,
    pub soh_percent: u8,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeError {
    #[error("gauge did not acknowledge")]
    NoAck,
    #[error("bus error talking to gauge")]
    Bus,
    #[error("gauge timed out waiting for {0}")]
    Timeout(&'static str),
}

impl GaugeError {
    pub(crate) fn from_bus<E: embedded_hal_async::i2c::Error>(error: E) -> Self {
        use embedded_hal_async::i2c::ErrorKind;

        match error.kind() {
            ErrorKind::NoAcknowledge(_) => Self::NoAck,
            _ => Self::Bus,
        }
    }
}

/// A fuel gauge sharing the sensor bus.
pub trait BatteryGauge {
    fn read_status<I: I2c>(
        &mut self,
        i2c: &mut I,
    ) -> impl Future<Output = Result<BatteryStatus, GaugeError>>;
}
