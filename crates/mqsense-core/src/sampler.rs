//! Per-sensor sampling: wake, burst-read with retry, average, sleep
//!
//! A [`Sampler`] borrows one sensor, the bus and the timebase for the
//! duration of that sensor's session. The burst buffer lives on the stack
//! and is moved into [`average`], so nothing is carried across cycles.

use embedded_hal_async::i2c::I2c;
use log::{debug, info, warn};

use crate::config::SamplerConfig;
use crate::reading::{MAX_CHANNELS, SampleBurst, SensorReading, Validity};
use crate::sensors::{ReadError, Sensor, SleepError, WakeError};
use crate::time::{Timebase, delay_for};

/// Retry bookkeeping for one burst slot. Never leaves the sampler.
#[derive(Debug, Default)]
struct RetryState {
    /// Retries spent so far; the initial read is not counted.
    retries: u8,
    last_error: Option<ReadError>,
}

impl RetryState {
    /// Spend one retry unless `max_retries` are used up.
    fn try_retry(&mut self, max_retries: u8) -> bool {
        if self.retries >= max_retries {
            return false;
        }
        self.retries += 1;
        true
    }
}

/// Sampling session for a single sensor.
pub struct Sampler<'a, S, I, T> {
    sensor: &'a mut S,
    i2c: &'a mut I,
    timebase: &'a mut T,
    config: SamplerConfig,
}

impl<'a, S, I, T> Sampler<'a, S, I, T>
where
    S: Sensor,
    I: I2c,
    T: Timebase,
{
    pub fn new(sensor: &'a mut S, i2c: &'a mut I, timebase: &'a mut T, config: SamplerConfig) -> Self {
        Self {
            sensor,
            i2c,
            timebase,
            config,
        }
    }

    /// Bring the sensor out of low power.
    pub async fn wake(&mut self) -> Result<(), WakeError> {
        self.sensor.wake(self.i2c, self.timebase).await
    }

    /// Acquire `burst_size` slots spaced by the configured settling delay.
    ///
    /// Every slot ends up `Valid` or `Invalid`; the first `warmup_discard`
    /// slots stay in the burst and are skipped by [`average`].
    pub async fn acquire_burst(&mut self, burst_size: usize, warmup_discard: usize) -> SampleBurst {
        let sensor_id = self.sensor.id();
        let mut burst = SampleBurst::new(sensor_id, self.timebase.now(), warmup_discard);

        for slot in 0..burst_size {
            delay_for(self.timebase, self.config.inter_sample_delay()).await;
            let reading = self.acquire_slot().await;

            debug!(
                "{} slot {}/{}: {:?} {:?}",
                sensor_id.label(),
                slot + 1,
                burst_size,
                reading.validity(),
                reading.channels()
            );

            if burst.push(reading).is_err() {
                warn!("{} burst buffer full at slot {}", sensor_id.label(), slot);
                break;
            }
        }

        burst
    }

    /// Return the sensor to low power.
    pub async fn sleep(&mut self) -> Result<(), SleepError> {
        self.sensor.sleep(self.i2c, self.timebase).await
    }

    /// Run the whole session and produce the averaged reading.
    ///
    /// Wake and sleep failures are logged and do not change the result.
    pub async fn run(mut self) -> SensorReading {
        let label = self.sensor.id().label();

        if let Err(e) = self.wake().await {
            warn!("{}: wake failed ({}), reading anyway", label, e);
        }

        let burst = self
            .acquire_burst(self.config.burst_size(), self.config.warmup_discard())
            .await;
        let discard = burst.warmup_discard();
        let reading = average(burst, discard);

        if let Err(e) = self.sleep().await {
            warn!("{}: sleep failed ({})", label, e);
        }

        info!(
            "{}: {:?} {:?}",
            label,
            reading.validity(),
            reading.channels()
        );
        reading
    }

    /// One slot: read, retrying not-ready responses with a fixed backoff.
    async fn acquire_slot(&mut self) -> SensorReading {
        let sensor_id = self.sensor.id();
        let mut retry = RetryState::default();

        loop {
            let reading = match self.sensor.read(self.i2c, self.timebase).await {
                Ok(values) => SensorReading::valid(sensor_id, self.timebase.now(), &values),
                Err(e) => {
                    retry.last_error = Some(e);
                    SensorReading::failed(sensor_id, self.timebase.now(), &e)
                }
            };

            if reading.validity() != Validity::NotReady {
                if let Some(e) = retry.last_error.filter(|_| !reading.is_valid()) {
                    warn!("{}: read failed ({})", sensor_id.label(), e);
                }
                return reading;
            }

            if !retry.try_retry(self.config.max_retries()) {
                warn!(
                    "{}: still not ready after {} retries",
                    sensor_id.label(),
                    self.config.max_retries()
                );
                return reading.into_invalid();
            }

            debug!(
                "{}: not ready, retry {}/{}",
                sensor_id.label(),
                retry.retries,
                self.config.max_retries()
            );
            delay_for(self.timebase, self.config.retry_backoff()).await;
        }
    }
}

/// Per-channel arithmetic mean over the valid readings at index ≥ `discard_count`.
///
/// [`Sampler::run`] passes the burst's own [`SampleBurst::warmup_discard`].
///
/// With no such reading the result is `Invalid` with sentinel channels.
pub fn average(burst: SampleBurst, discard_count: usize) -> SensorReading {
    let sensor_id = burst.sensor_id();
    let timestamp = burst
        .readings()
        .last()
        .map(|r| r.timestamp())
        .unwrap_or(burst.started_at());

    let mut sums = [0.0f32; MAX_CHANNELS];
    let mut channel_count = 0;
    let mut count = 0u32;

    for reading in burst
        .readings()
        .iter()
        .skip(discard_count)
        .filter(|r| r.is_valid())
    {
        let channels = reading.channels();
        channel_count = channel_count.max(channels.len());
        for (sum, value) in sums.iter_mut().zip(channels) {
            *sum += value;
        }
        count += 1;
    }

    if count == 0 {
        return SensorReading::no_data(sensor_id, timestamp);
    }

    let mut means = [0.0f32; MAX_CHANNELS];
    for (mean, sum) in means.iter_mut().zip(sums) {
        *mean = sum / count as f32;
    }

    SensorReading::valid(sensor_id, timestamp, &means[..channel_count])
}
