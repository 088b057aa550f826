//! Compile-time configuration of the node
//!
//! Constructors are `const fn` and validate their arguments, so an invalid
//! configuration bound to a `const` item fails the build instead of
//! surfacing at runtime.

use embassy_time::Duration;
use thiserror_no_std::Error;

use crate::reading::MAX_BURST;

/// Retries per burst slot after a not-ready response.
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// Fixed wait between retries of a not-ready slot.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1000);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("burst size must be at least 1")]
    EmptyBurst,
    #[error("burst size {requested} exceeds the burst buffer capacity {capacity}")]
    BurstTooLarge { requested: usize, capacity: usize },
    #[error("warm-up discard {discard} must be smaller than the burst size {burst}")]
    DiscardNotBelowBurst { discard: usize, burst: usize },
}

/// How one sensor is sampled during a wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    burst_size: usize,
    warmup_discard: usize,
    inter_sample_delay: Duration,
    max_retries: u8,
    retry_backoff: Duration,
}

impl SamplerConfig {
    /// Build a sampler configuration, panicking on invalid input.
    ///
    /// Used in a `const` item, the panic becomes a compile error.
    pub const fn new(burst_size: usize, warmup_discard: usize, inter_sample_delay: Duration) -> Self {
        match Self::try_new(burst_size, warmup_discard, inter_sample_delay) {
            Ok(config) => config,
            Err(ConfigError::EmptyBurst) => panic!("burst size must be at least 1"),
            Err(ConfigError::BurstTooLarge { .. }) => {
                panic!("burst size exceeds the burst buffer capacity")
            }
            Err(ConfigError::DiscardNotBelowBurst { .. }) => {
                panic!("warm-up discard must be smaller than the burst size")
            }
        }
    }

    pub const fn try_new(
        burst_size: usize,
        warmup_discard: usize,
        inter_sample_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if burst_size == 0 {
            return Err(ConfigError::EmptyBurst);
        }
        if burst_size > MAX_BURST {
            return Err(ConfigError::BurstTooLarge {
                requested: burst_size,
                capacity: MAX_BURST,
            });
        }
        if warmup_discard >= burst_size {
            return Err(ConfigError::DiscardNotBelowBurst {
                discard: warmup_discard,
                burst: burst_size,
            });
        }

        Ok(Self {
            burst_size,
            warmup_discard,
            inter_sample_delay,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        })
    }

    /// Override the retry policy for not-ready slots.
    pub const fn with_retry(mut self, max_retries: u8, retry_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = retry_backoff;
        self
    }

    pub const fn burst_size(&self) -> usize {
        self.burst_size
    }

    pub const fn warmup_discard(&self) -> usize {
        self.warmup_discard
    }

    /// Settling time waited before every slot of the burst
    pub const fn inter_sample_delay(&self) -> Duration {
        self.inter_sample_delay
    }

    pub const fn max_retries(&self) -> u8 {
        self.max_retries
    }

    pub const fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }
}

/// SPS30: three readings two seconds apart, the first two discarded while the fan settles.
pub const SPS30_SAMPLING: SamplerConfig = SamplerConfig::new(3, 2, Duration::from_millis(2000));

/// SHT31: one single-shot measurement; the delay covers the high-repeatability conversion.
pub const SHT31_SAMPLING: SamplerConfig = SamplerConfig::new(1, 0, Duration::from_millis(20));

/// SCD41: one reading after the five second periodic measurement interval.
pub const SCD41_SAMPLING: SamplerConfig = SamplerConfig::new(1, 0, Duration::from_millis(5000));

/// One-time fuel gauge calibration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeCalibration {
    /// Battery capacity in mAh
    pub design_capacity_mah: u16,
    /// Lowest operational voltage in mV; the gauge reports 0% here
    pub terminate_voltage_mv: u16,
    /// Current at which the charger stops charging, in mA
    pub taper_current_ma: u16,
}

impl GaugeCalibration {
    /// Design energy in mWh for the bq27441-G1A (capacity × 3.7 V).
    pub const fn design_energy_mwh(&self) -> u16 {
        ((self.design_capacity_mah as u32 * 37) / 10) as u16
    }

    /// Taper rate = design capacity / (0.1 × taper current).
    pub const fn taper_rate(&self) -> u16 {
        if self.taper_current_ma == 0 {
            return 0;
        }
        ((10 * self.design_capacity_mah as u32) / self.taper_current_ma as u32) as u16
    }
}

/// Node-wide settings. Former build-time toggles are plain flags here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Time spent in deep sleep between wake cycles
    pub sleep_interval: Duration,
    /// Expected upper bound of the active phase; overruns are logged
    pub active_budget: Duration,
    /// Emit diagnostic logs
    pub diagnostics: bool,
    /// Write the gauge calibration when the gauge has lost its configuration
    pub calibrate_gauge: bool,
    pub gauge: GaugeCalibration,
}

/// Bench configuration: five second sleep. Deployments should sleep much longer.
pub const NODE_CONFIG: NodeConfig = NodeConfig {
    sleep_interval: Duration::from_secs(5),
    active_budget: Duration::from_secs(30),
    diagnostics: true,
    calibrate_gauge: true,
    gauge: GaugeCalibration {
        design_capacity_mah: 3450,
        terminate_voltage_mv: 2650,
        taper_current_ma: 50,
    },
};
