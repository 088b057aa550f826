//! One complete wake cycle: sample, read the battery, render
//!
//! Arming the wake timer and entering deep sleep are left to the caller
//! through the [`DutyCycleController`](crate::duty_cycle::DutyCycleController),
//! since that step never returns.

use embedded_hal_async::i2c::I2c;
use log::{error, info, warn};

use crate::config::GaugeCalibration;
use crate::display::Display;
use crate::gauge::{BatteryGauge, BatteryStatus, Bq27441, GaugeError};
use crate::orchestrator::{Orchestrator, SensorSet};
use crate::time::Timebase;

/// Outcome of [`run_wake_cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Snapshot entries holding measured data
    pub valid: usize,
    /// Snapshot entries without data
    pub invalid: usize,
    /// `None` when the gauge could not be read
    pub battery: Option<BatteryStatus>,
    /// Whether the display accepted the frame
    pub rendered: bool,
}

/// Sample every sensor, read the gauge and render the summary.
///
/// Gauge and display failures are logged and reflected in the report; they
/// never abort the cycle.
pub async fn run_wake_cycle<I, T, L, G, D>(
    orchestrator: &mut Orchestrator<I, T>,
    sensors: &mut L,
    gauge: &mut G,
    display: &mut D,
) -> CycleReport
where
    I: I2c,
    T: Timebase,
    L: SensorSet,
    G: BatteryGauge,
    D: Display,
{
    let snapshot = orchestrator.run_cycle(sensors).await;

    let battery = match gauge.read_status(orchestrator.bus()).await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!("Battery status unavailable: {}", e);
            None
        }
    };

    let rendered = match display.render(&snapshot, battery.as_ref()).await {
        Ok(()) => true,
        Err(e) => {
            error!("Display update failed: {:?}", e);
            false
        }
    };

    let valid = snapshot.valid_count();
    CycleReport {
        valid,
        invalid: snapshot.len() - valid,
        battery,
        rendered,
    }
}

/// Write the gauge calibration if the gauge lost it (power-on reset).
///
/// Returns whether a calibration was written.
pub async fn calibrate_gauge_if_needed<I: I2c, T: Timebase>(
    orchestrator: &mut Orchestrator<I, T>,
    gauge: &mut Bq27441,
    calibration: &GaugeCalibration,
) -> Result<bool, GaugeError> {
    let (bus, timebase) = orchestrator.parts_mut();
    if !gauge.needs_configuration(bus).await? {
        return Ok(false);
    }

    info!("Gauge reports power-on reset, calibrating");
    gauge.configure(bus, timebase, calibration).await?;
    Ok(true)
}
