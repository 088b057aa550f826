//! Active/sleep duty cycle of the node
//!
//! Deep sleep is not a suspension: nothing survives it and execution restarts
//! at the firmware entry point on the next timer wake. The controller models
//! that by consuming itself in [`DutyCycleController::enter_low_power`], which
//! never returns.

use embassy_time::{Duration, Instant};
use log::{info, warn};

use crate::config::NodeConfig;

/// Platform hooks for the wake timer and the deep-sleep transition.
pub trait PowerControl {
    /// Schedule the next wake `duration` from now.
    fn arm_wake_timer(&mut self, duration: Duration);

    /// Power down. Execution resumes at the entry point after the timer fires.
    fn enter_deep_sleep(self) -> !;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Active,
    Sleeping,
}

/// Bounds the active phase and drives the transition into deep sleep.
pub struct DutyCycleController<P> {
    power: P,
    state: PowerState,
    interval: Duration,
    active_budget: Duration,
    active_since: Instant,
    armed: Option<Duration>,
}

impl<P: PowerControl> DutyCycleController<P> {
    /// Start the active phase of a cycle that woke at `woke_at`.
    pub fn new(power: P, config: &NodeConfig, woke_at: Instant) -> Self {
        Self {
            power,
            state: PowerState::Active,
            interval: config.sleep_interval,
            active_budget: config.active_budget,
            active_since: woke_at,
            armed: None,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Configured time between wake cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Duration of the armed wake timer, if any
    pub fn armed(&self) -> Option<Duration> {
        self.armed
    }

    /// Schedule the next wake.
    pub fn arm_wake_timer(&mut self, duration: Duration) {
        self.power.arm_wake_timer(duration);
        self.armed = Some(duration);
        info!("Wake timer armed for {} ms", duration.as_millis());
    }

    /// Time spent active so far; logs a warning once the budget is exceeded.
    pub fn check_active_budget(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.active_since);
        if elapsed > self.active_budget {
            warn!(
                "Active phase took {} ms, budget is {} ms",
                elapsed.as_millis(),
                self.active_budget.as_millis()
            );
        }
        elapsed
    }

    /// Terminal action of the cycle.
    ///
    /// Arms the configured interval first if no timer was armed, so the node
    /// never sleeps without a wake source.
    pub fn enter_low_power(mut self) -> ! {
        if self.armed.is_none() {
            self.arm_wake_timer(self.interval);
        }
        self.state = PowerState::Sleeping;
        info!("Entering deep sleep");
        self.power.enter_deep_sleep()
    }
}
