//! Per-cycle snapshot of every configured sensor's final reading

use embassy_time::Instant;
use log::error;

use crate::reading::{SensorId, SensorReading};

/// Maximum number of sensors sampled in one wake cycle.
pub const MAX_SENSORS: usize = 6;

/// Final readings of one wake cycle, in sampling order.
///
/// Only the orchestrator builds snapshots, and only after every sensor's
/// burst has completed. Consumers get it by shared reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    cycle_started: Instant,
    entries: heapless::Vec<SensorReading, MAX_SENSORS>,
}

impl Snapshot {
    /// Reading for `id`, if that sensor is configured
    pub fn get(&self, id: SensorId) -> Option<&SensorReading> {
        self.entries.iter().find(|r| r.sensor_id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|r| r.is_valid()).count()
    }

    pub fn cycle_started(&self) -> Instant {
        self.cycle_started
    }
}

/// Collects readings while a cycle runs; turned into a [`Snapshot`] at the end.
///
/// Only the orchestrator creates one.
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub(crate) fn new(cycle_started: Instant) -> Self {
        Self {
            snapshot: Snapshot {
                cycle_started,
                entries: heapless::Vec::new(),
            },
        }
    }

    /// Sensor sets are bounded by [`MAX_SENSORS`] at compile time, so a full
    /// builder means a caller bypassed that bound.
    pub(crate) fn record(&mut self, reading: SensorReading) {
        if let Err(dropped) = self.snapshot.entries.push(reading) {
            error!(
                "Snapshot full, dropping {} reading",
                dropped.sensor_id().label()
            );
        }
    }

    pub(crate) fn finish(self) -> Snapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_sensor() {
        let t = Instant::from_millis(0);
        let mut builder = SnapshotBuilder::new(t);
        builder.record(SensorReading::valid(SensorId::Climate, t, &[20.0, 45.0]));
        builder.record(SensorReading::no_data(SensorId::CarbonDioxide, t));
        let snapshot = builder.finish();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.valid_count(), 1);
        assert_eq!(
            snapshot.get(SensorId::Climate).and_then(|r| r.value(1)),
            Some(45.0)
        );
        assert!(!snapshot.get(SensorId::CarbonDioxide).unwrap().is_valid());
        assert!(snapshot.get(SensorId::ParticulateMatter).is_none());
    }

    #[test]
    fn test_full_snapshot_keeps_order() {
        let t = Instant::from_millis(0);
        let mut builder = SnapshotBuilder::new(t);
        for i in 0..MAX_SENSORS {
            builder.record(SensorReading::valid(SensorId::Climate, t, &[i as f32, 50.0]));
        }
        let snapshot = builder.finish();

        assert_eq!(snapshot.len(), MAX_SENSORS);
        let firsts: Vec<f32> = snapshot.iter().filter_map(|r| r.value(0)).collect();
        assert_eq!(firsts, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
