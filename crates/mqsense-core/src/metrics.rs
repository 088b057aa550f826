//! Air-quality level assessment
//!
//! Maps PM2.5 and CO2 readings onto a coarse four-step scale used by the
//! summary screen.

use crate::reading::{SensorId, SensorReading};

/// Channel index of PM2.5 in particulate readings
const PM2_5_CHANNEL: usize = 1;
/// Channel index of CO2 in carbon dioxide readings
const CO2_CHANNEL: usize = 0;

/// Quality level of a pollutant concentration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityLevel {
    Good,
    Moderate,
    Poor,
    Bad,
}

impl QualityLevel {
    /// PM2.5 in ug/m3, breakpoints after the US EPA AQI bands
    pub fn assess_pm2_5(value: f32) -> Self {
        if value <= 12.0 {
            Self::Good
        } else if value <= 35.4 {
            Self::Moderate
        } else if value <= 55.4 {
            Self::Poor
        } else {
            Self::Bad
        }
    }

    /// CO2 in ppm
    ///
    /// Outdoor air sits around 420 ppm; above ~1000 ppm indoor air is stale.
    pub fn assess_co2(value: f32) -> Self {
        if value <= 800.0 {
            Self::Good
        } else if value <= 1200.0 {
            Self::Moderate
        } else if value <= 2000.0 {
            Self::Poor
        } else {
            Self::Bad
        }
    }

    /// Level for a reading, if the sensor has a rated channel and the reading is valid.
    pub fn for_reading(reading: &SensorReading) -> Option<Self> {
        match reading.sensor_id() {
            SensorId::ParticulateMatter => reading.value(PM2_5_CHANNEL).map(Self::assess_pm2_5),
            SensorId::CarbonDioxide => reading.value(CO2_CHANNEL).map(Self::assess_co2),
            SensorId::Climate => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::Bad => "Bad",
        }
    }
}
