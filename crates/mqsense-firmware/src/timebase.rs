//! embassy-time backed delays and clock for the sampling core

use embassy_time::{Instant, Timer};
use embedded_hal_async::delay::DelayNs;
use mqsense_core::time::Clock;

/// Delays on the embassy timer queue; timestamps from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTimebase;

impl DelayNs for EmbassyTimebase {
    async fn delay_ns(&mut self, ns: u32) {
        Timer::after_nanos(u64::from(ns)).await;
    }

    async fn delay_us(&mut self, us: u32) {
        Timer::after_micros(u64::from(us)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(u64::from(ms)).await;
    }
}

impl Clock for EmbassyTimebase {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
