//! Sensor trait, error taxonomy and the concrete air-quality sensor drivers
//!
//! Drivers never own the I2C bus. The orchestrator lends `&mut` access to one
//! sensor at a time, which is what keeps bus transactions exclusive.

#[cfg(any(
    feature = "sensor-sps30",
    feature = "sensor-sht31",
    feature = "sensor-scd41"
))]
mod sensirion;

#[cfg(feature = "sensor-scd41")]
mod scd41;
#[cfg(feature = "sensor-sht31")]
mod sht31;
#[cfg(feature = "sensor-sps30")]
mod sps30;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};
use thiserror_no_std::Error;

use crate::reading::{Channels, SensorId};

#[cfg(feature = "sensor-scd41")]
pub use scd41::Scd41;
#[cfg(feature = "sensor-sht31")]
pub use sht31::Sht31;
#[cfg(feature = "sensor-sps30")]
pub use sps30::Sps30;

/// Errors from a single acquisition attempt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Device reported that no new data is available yet. Retried.
    #[error("data not ready")]
    NotReady,
    #[error("device did not acknowledge")]
    NoAck,
    #[error("bus error")]
    Bus,
    #[error("CRC mismatch in sensor response")]
    Crc,
    #[error("invalid sample: {0}")]
    InvalidSample(&'static str),
}

impl ReadError {
    /// Transient errors are worth retrying after a backoff.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady)
    }

    /// Stable numeric code recorded in readings as `raw_error_code`.
    pub const fn code(&self) -> u16 {
        match self {
            Self::NotReady => 1,
            Self::NoAck => 2,
            Self::Bus => 3,
            Self::Crc => 4,
            Self::InvalidSample(_) => 5,
        }
    }

    pub(crate) fn from_bus<E: embedded_hal_async::i2c::Error>(error: E) -> Self {
        if is_nack(&error) {
            Self::NoAck
        } else {
            Self::Bus
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeError {
    #[error("device did not acknowledge wake-up")]
    NoAck,
    #[error("bus error during wake-up")]
    Bus,
    #[error("wake-up response corrupted")]
    Crc,
}

impl WakeError {
    pub(crate) fn from_bus<E: embedded_hal_async::i2c::Error>(error: E) -> Self {
        if is_nack(&error) {
            Self::NoAck
        } else {
            Self::Bus
        }
    }
}

impl From<ReadError> for WakeError {
    fn from(error: ReadError) -> Self {
        match error {
            ReadError::NoAck | ReadError::NotReady => Self::NoAck,
            ReadError::Crc => Self::Crc,
            ReadError::Bus | ReadError::InvalidSample(_) => Self::Bus,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepError {
    #[error("device did not acknowledge sleep command")]
    NoAck,
    #[error("bus error during sleep command")]
    Bus,
}

impl SleepError {
    pub(crate) fn from_bus<E: embedded_hal_async::i2c::Error>(error: E) -> Self {
        if is_nack(&error) {
            Self::NoAck
        } else {
            Self::Bus
        }
    }
}

fn is_nack<E: embedded_hal_async::i2c::Error>(error: &E) -> bool {
    matches!(error.kind(), ErrorKind::NoAcknowledge(_))
}

/// A sensor that can be woken, read and put back into low power.
///
/// Every operation borrows the bus and a delay for its own duration only.
pub trait Sensor {
    /// Which sensor this is; fixes the channel layout of its readings.
    fn id(&self) -> SensorId;

    /// Bring the sensor from low power into measurement mode.
    fn wake<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> impl Future<Output = Result<(), WakeError>>;

    /// One acquisition attempt.
    fn read<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> impl Future<Output = Result<Channels, ReadError>>;

    /// Return the sensor to its low-power state.
    fn sleep<I: I2c, D: DelayNs>(
        &mut self,
        i2c: &mut I,
        delay: &mut D,
    ) -> impl Future<Output = Result<(), SleepError>>;
}

/// Wait used after commands that need execution time on the device.
pub(crate) async fn command_delay<D: DelayNs>(delay: &mut D, duration: Duration) {
    crate::time::delay_for(delay, duration).await;
}
