//! Time capabilities injected into the sampler and orchestrator
//!
//! Settling delays and retry backoff go through `DelayNs`, timestamps
//! through [`Clock`]. The firmware backs both with embassy-time; tests use a
//! simulated timebase so no real time passes.

use embassy_time::{Duration, Instant};
use embedded_hal_async::delay::DelayNs;

/// Source of monotonic timestamps.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Everything the sampling loop needs from time: blocking-style delays and a clock.
pub trait Timebase: DelayNs + Clock {}

impl<T: DelayNs + Clock> Timebase for T {}

/// Delay for an embassy `Duration` through an async `DelayNs`.
///
/// Durations longer than `u32::MAX` milliseconds are clamped.
pub async fn delay_for<D: DelayNs>(delay: &mut D, duration: Duration) {
    let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    delay.delay_ms(millis).await;
}
