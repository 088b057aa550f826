//! Sensor readings and bursts
//!
//! A [`SensorReading`] is immutable once produced and always carries an
//! explicit [`Validity`]. Channels of a reading that is not `Valid` hold the
//! [`NO_DATA`] sentinel, which is numerically zero; use
//! [`SensorReading::value`] to get a channel only when it was measured.

use embassy_time::Instant;

use crate::sensors::ReadError;

/// Maximum number of channels a single sensor reports.
pub const MAX_CHANNELS: usize = 4;

/// Maximum number of slots in one burst.
pub const MAX_BURST: usize = 8;

/// Channel value stored when a reading carries no data.
pub const NO_DATA: f32 = 0.0;

/// Channel values of one reading, in the sensor's fixed channel order.
pub type Channels = heapless::Vec<f32, MAX_CHANNELS>;

/// Static description of one channel, used for logging and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub label: &'static str,
    pub unit: &'static str,
    /// Number of decimals shown on the display
    pub precision: usize,
}

const PM_CHANNELS: [ChannelInfo; 4] = [
    ChannelInfo {
        label: "PM1.0",
        unit: "ug/m3",
        precision: 1,
    },
    ChannelInfo {
        label: "PM2.5",
        unit: "ug/m3",
        precision: 1,
    },
    ChannelInfo {
        label: "PM4.0",
        unit: "ug/m3",
        precision: 1,
    },
    ChannelInfo {
        label: "PM10",
        unit: "ug/m3",
        precision: 1,
    },
];

const CLIMATE_CHANNELS: [ChannelInfo; 2] = [
    ChannelInfo {
        label: "Temp",
        unit: "C",
        precision: 1,
    },
    ChannelInfo {
        label: "Hum",
        unit: "%",
        precision: 1,
    },
];

const CO2_CHANNELS: [ChannelInfo; 1] = [ChannelInfo {
    label: "CO2",
    unit: "ppm",
    precision: 0,
}];

/// Identifies a sensor and, through it, the layout of its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorId {
    /// Particulate mass concentration (SPS30)
    ParticulateMatter,
    /// Temperature and relative humidity (SHT31)
    Climate,
    /// CO2 concentration (SCD41)
    CarbonDioxide,
}

impl SensorId {
    /// Short label for logs and the display
    pub const fn label(self) -> &'static str {
        match self {
            Self::ParticulateMatter => "Particulates",
            Self::Climate => "Climate",
            Self::CarbonDioxide => "CO2",
        }
    }

    /// Channel layout reported by this sensor
    pub const fn channels(self) -> &'static [ChannelInfo] {
        match self {
            Self::ParticulateMatter => &PM_CHANNELS,
            Self::Climate => &CLIMATE_CHANNELS,
            Self::CarbonDioxide => &CO2_CHANNELS,
        }
    }

    pub const fn channel_count(self) -> usize {
        self.channels().len()
    }
}

/// Whether a reading holds measured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
    /// The device reported that no new data was available yet
    NotReady,
}

/// A timestamped, validated measurement from one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    sensor_id: SensorId,
    timestamp: Instant,
    channels: Channels,
    validity: Validity,
    raw_error_code: Option<u16>,
}

impl SensorReading {
    /// A measured reading. Extra values beyond [`MAX_CHANNELS`] are dropped.
    pub fn valid(sensor_id: SensorId, timestamp: Instant, values: &[f32]) -> Self {
        let mut channels = Channels::new();
        for &value in values.iter().take(MAX_CHANNELS) {
            // Cannot fail, the iterator is bounded by the capacity.
            let _ = channels.push(value);
        }

        Self {
            sensor_id,
            timestamp,
            channels,
            validity: Validity::Valid,
            raw_error_code: None,
        }
    }

    /// A reading with no data and no device error attached.
    pub fn no_data(sensor_id: SensorId, timestamp: Instant) -> Self {
        Self {
            sensor_id,
            timestamp,
            channels: sentinel_channels(sensor_id),
            validity: Validity::Invalid,
            raw_error_code: None,
        }
    }

    /// A reading for a failed acquisition attempt.
    ///
    /// Transient errors yield `NotReady`, everything else `Invalid`.
    pub fn failed(sensor_id: SensorId, timestamp: Instant, error: &ReadError) -> Self {
        let validity = if error.is_transient() {
            Validity::NotReady
        } else {
            Validity::Invalid
        };

        Self {
            sensor_id,
            timestamp,
            channels: sentinel_channels(sensor_id),
            validity,
            raw_error_code: Some(error.code()),
        }
    }

    /// Downgrade to `Invalid`, keeping the error code. Used once retries are exhausted.
    pub(crate) fn into_invalid(mut self) -> Self {
        self.validity = Validity::Invalid;
        self
    }

    pub fn sensor_id(&self) -> SensorId {
        self.sensor_id
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    pub fn raw_error_code(&self) -> Option<u16> {
        self.raw_error_code
    }

    /// Raw channel values, sentinel included. Check [`Self::validity`] first.
    pub fn channels(&self) -> &[f32] {
        &self.channels
    }

    /// Channel `index` if this reading holds measured data.
    pub fn value(&self, index: usize) -> Option<f32> {
        if self.is_valid() {
            self.channels.get(index).copied()
        } else {
            None
        }
    }
}

fn sentinel_channels(sensor_id: SensorId) -> Channels {
    let mut channels = Channels::new();
    for _ in 0..sensor_id.channel_count().min(MAX_CHANNELS) {
        let _ = channels.push(NO_DATA);
    }
    channels
}

/// Readings of one sensor across the slots of a single burst.
///
/// Owned by the sampler for the duration of a cycle and consumed by averaging.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBurst {
    sensor_id: SensorId,
    started_at: Instant,
    warmup_discard: usize,
    readings: heapless::Vec<SensorReading, MAX_BURST>,
}

impl SampleBurst {
    pub fn new(sensor_id: SensorId, started_at: Instant, warmup_discard: usize) -> Self {
        Self {
            sensor_id,
            started_at,
            warmup_discard,
            readings: heapless::Vec::new(),
        }
    }

    /// Append the reading of the next slot. Returns the reading back if the burst is full.
    pub fn push(&mut self, reading: SensorReading) -> Result<(), SensorReading> {
        self.readings.push(reading)
    }

    pub fn sensor_id(&self) -> SensorId {
        self.sensor_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Number of leading slots this burst was acquired to discard
    pub fn warmup_discard(&self) -> usize {
        self.warmup_discard
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.readings.iter().filter(|r| r.is_valid()).count()
    }
}
