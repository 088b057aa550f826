//! Wake-cycle orchestration across all sensors
//!
//! The orchestrator owns the I2C bus and the timebase. Sensors are sampled
//! strictly one after another in the order of the configured [`SensorSet`],
//! each through its own [`Sampler`] session; the next sensor's wake never
//! starts before the previous sensor's sleep has returned.

use embedded_hal_async::i2c::I2c;
use log::info;

use crate::config::SamplerConfig;
use crate::reading::SensorReading;
use crate::sampler::Sampler;
use crate::sensors::Sensor;
use crate::snapshot::{MAX_SENSORS, Snapshot, SnapshotBuilder};
use crate::time::Timebase;

/// A sensor paired with how it is sampled.
pub struct SensorSlot<S> {
    sensor: S,
    config: SamplerConfig,
}

impl<S: Sensor> SensorSlot<S> {
    pub const fn new(sensor: S, config: SamplerConfig) -> Self {
        Self { sensor, config }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}

/// An ordered, fixed list of sensors sampled in one wake cycle.
///
/// Implemented for tuples of up to six [`SensorSlot`]s of different sensor
/// types and for arrays of at most [`MAX_SENSORS`] slots of one type; a
/// longer array fails to compile. Element order is sampling order and
/// snapshot order.
pub trait SensorSet {
    /// Sample every sensor in order, recording one reading per sensor.
    #[doc(hidden)]
    fn sample_into<I: I2c, T: Timebase>(
        &mut self,
        orchestrator: &mut Orchestrator<I, T>,
        snapshot: &mut SnapshotBuilder,
    ) -> impl Future<Output = ()>;
}

macro_rules! impl_sensor_set {
    ($($sensor:ident : $idx:tt),+) => {
        impl<$($sensor: Sensor),+> SensorSet for ($(SensorSlot<$sensor>,)+) {
            async fn sample_into<I: I2c, T: Timebase>(
                &mut self,
                orchestrator: &mut Orchestrator<I, T>,
                snapshot: &mut SnapshotBuilder,
            ) {
                $(
                    let reading = orchestrator.sample(&mut self.$idx).await;
                    snapshot.record(reading);
                )+
            }
        }
    };
}

impl_sensor_set!(A: 0);
impl_sensor_set!(A: 0, B: 1);
impl_sensor_set!(A: 0, B: 1, C: 2);
impl_sensor_set!(A: 0, B: 1, C: 2, D: 3);
impl_sensor_set!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_sensor_set!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl<S: Sensor, const N: usize> SensorSet for [SensorSlot<S>; N] {
    async fn sample_into<I: I2c, T: Timebase>(
        &mut self,
        orchestrator: &mut Orchestrator<I, T>,
        snapshot: &mut SnapshotBuilder,
    ) {
        const { assert!(N <= MAX_SENSORS, "more sensors than a snapshot holds") };

        for slot in self.iter_mut() {
            let reading = orchestrator.sample(slot).await;
            snapshot.record(reading);
        }
    }
}

/// Runs the per-sensor sampling sequence for one wake cycle.
pub struct Orchestrator<I, T> {
    i2c: I,
    timebase: T,
}

impl<I: I2c, T: Timebase> Orchestrator<I, T> {
    pub fn new(i2c: I, timebase: T) -> Self {
        Self { i2c, timebase }
    }

    /// Sample every sensor of `sensors` in order and assemble the snapshot.
    ///
    /// Never fails: a sensor whose session fails entirely contributes an
    /// `Invalid` reading and the cycle moves on to the next sensor.
    pub async fn run_cycle<L: SensorSet>(&mut self, sensors: &mut L) -> Snapshot {
        let mut builder = SnapshotBuilder::new(self.timebase.now());
        sensors.sample_into(self, &mut builder).await;

        let snapshot = builder.finish();
        info!(
            "Cycle complete: {}/{} sensors valid",
            snapshot.valid_count(),
            snapshot.len()
        );
        snapshot
    }

    /// Full wake → burst → average → sleep session for one sensor.
    pub async fn sample<S: Sensor>(&mut self, slot: &mut SensorSlot<S>) -> SensorReading {
        Sampler::new(&mut slot.sensor, &mut self.i2c, &mut self.timebase, slot.config)
            .run()
            .await
    }

    /// The bus, for collaborators used once all sensors are back asleep.
    pub fn bus(&mut self) -> &mut I {
        &mut self.i2c
    }

    pub fn timebase(&mut self) -> &mut T {
        &mut self.timebase
    }

    /// Bus and timebase together, for collaborators that need both at once.
    pub fn parts_mut(&mut self) -> (&mut I, &mut T) {
        (&mut self.i2c, &mut self.timebase)
    }

    pub fn into_parts(self) -> (I, T) {
        (self.i2c, self.timebase)
    }
}
