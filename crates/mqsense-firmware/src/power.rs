//! RTC timer wake-up and deep sleep

use embassy_time::Duration;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use mqsense_core::duty_cycle::PowerControl;

/// [`PowerControl`] on the ESP32 RTC controller.
///
/// The timer wake source is only configured when entering deep sleep, so
/// arming just records the duration.
pub struct RtcPower<'d> {
    rtc: Rtc<'d>,
    wake_after: Duration,
}

impl<'d> RtcPower<'d> {
    pub fn new(rtc: Rtc<'d>, default_interval: Duration) -> Self {
        Self {
            rtc,
            wake_after: default_interval,
        }
    }
}

impl PowerControl for RtcPower<'_> {
    fn arm_wake_timer(&mut self, duration: Duration) {
        self.wake_after = duration;
    }

    fn enter_deep_sleep(mut self) -> ! {
        let timer = TimerWakeupSource::new(core::time::Duration::from_millis(
            self.wake_after.as_millis(),
        ));
        self.rtc.sleep_deep(&[&timer])
    }
}
