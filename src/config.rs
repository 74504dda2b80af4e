//! Monitor configuration.
//!
//! Defaults are compiled from `config/monitor.toml` by the build script. At
//! runtime the detector and gate thresholds can be recalibrated through
//! [`ThresholdUpdate`], which is applied to a copy and validated before it
//! replaces the live values.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerConfig {
    pub fall_window_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdDeltaConfig {
    pub acceleration_threshold: f32,
    pub inactivity_threshold_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowedWeightConfig {
    pub acceleration_weight: u16,
    pub rotation_weight: u16,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowedConfig {
    pub acceleration_threshold: f32,
    pub rotation_threshold: f32,
    pub high_acceleration_min: u8,
    pub high_rotation_min: u8,
    pub weights: WindowedWeightConfig,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrategyKind {
    ThresholdDelta,
    Windowed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub sampler: SamplerConfig,
    pub threshold_delta: ThresholdDeltaConfig,
    pub windowed: WindowedConfig,
    pub strategy: StrategyKind,
    pub debounce_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub timeout_ms: u64,
    pub tick_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyConfig {
    pub channel_timeout_ms: u64,
    pub system_alert_enabled: bool,
    pub email_enabled: bool,
    pub sms_enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorConfig {
    pub detector: DetectorConfig,
    pub confirmation: ConfirmationConfig,
    pub notify: NotifyConfig,
}

include!(concat!(env!("OUT_DIR"), "/monitor_config.rs"));

pub fn active_config() -> &'static MonitorConfig {
    &MONITOR_CONFIG
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MONITOR_CONFIG
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    NegativeOrNonFinite(&'static str),
    ZeroDuration(&'static str),
    TimeoutBelowTick,
    ZeroCount(&'static str),
    ZeroWeights,
    NoChannels,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeOrNonFinite(field) => write!(f, "{field} must be finite and >= 0"),
            Self::ZeroDuration(field) => write!(f, "{field} must be > 0"),
            Self::TimeoutBelowTick => write!(f, "confirmation timeout must be >= tick"),
            Self::ZeroCount(field) => write!(f, "{field} must be >= 1"),
            Self::ZeroWeights => write!(f, "windowed weights are all zero"),
            Self::NoChannels => write!(f, "no notification channel enabled"),
        }
    }
}

fn check_threshold(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeOrNonFinite(field))
    }
}

fn check_duration(value: u64, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroDuration(field))
    } else {
        Ok(())
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_duration(self.sampler.fall_window_ms, "fall_window_ms")?;
        check_threshold(
            self.threshold_delta.acceleration_threshold,
            "acceleration_threshold",
        )?;
        check_duration(
            self.threshold_delta.inactivity_threshold_ms,
            "inactivity_threshold_ms",
        )?;
        check_threshold(
            self.windowed.acceleration_threshold,
            "windowed.acceleration_threshold",
        )?;
        check_threshold(self.windowed.rotation_threshold, "rotation_threshold")?;
        if self.windowed.high_acceleration_min == 0 {
            return Err(ConfigError::ZeroCount("high_acceleration_min"));
        }
        if self.windowed.high_rotation_min == 0 {
            return Err(ConfigError::ZeroCount("high_rotation_min"));
        }
        if self.windowed.weights.acceleration_weight == 0
            && self.windowed.weights.rotation_weight == 0
        {
            return Err(ConfigError::ZeroWeights);
        }
        check_duration(self.debounce_ms, "debounce_ms")
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        check_duration(self.confirmation.tick_ms, "tick_ms")?;
        check_duration(self.confirmation.timeout_ms, "timeout_ms")?;
        if self.confirmation.timeout_ms < self.confirmation.tick_ms {
            return Err(ConfigError::TimeoutBelowTick);
        }
        check_duration(self.notify.channel_timeout_ms, "channel_timeout_ms")?;
        if !(self.notify.system_alert_enabled || self.notify.email_enabled || self.notify.sms_enabled)
        {
            return Err(ConfigError::NoChannels);
        }
        Ok(())
    }
}

/// Partial recalibration. Unset fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThresholdUpdate {
    pub acceleration_threshold: Option<f32>,
    pub inactivity_threshold_ms: Option<u64>,
    pub fall_window_ms: Option<u64>,
    pub debounce_ms: Option<u64>,
    pub confirmation_timeout_ms: Option<u64>,
    pub rotation_threshold: Option<f32>,
    pub windowed_acceleration_threshold: Option<f32>,
    pub strategy: Option<StrategyKind>,
}

impl ThresholdUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the updated configuration, or the first validation error. The
    /// input is never modified.
    pub fn applied_to(&self, current: &MonitorConfig) -> Result<MonitorConfig, ConfigError> {
        let mut next = *current;
        if let Some(value) = self.acceleration_threshold {
            next.detector.threshold_delta.acceleration_threshold = value;
        }
        if let Some(value) = self.inactivity_threshold_ms {
            next.detector.threshold_delta.inactivity_threshold_ms = value;
        }
        if let Some(value) = self.fall_window_ms {
            next.detector.sampler.fall_window_ms = value;
        }
        if let Some(value) = self.debounce_ms {
            next.detector.debounce_ms = value;
        }
        if let Some(value) = self.confirmation_timeout_ms {
            next.confirmation.timeout_ms = value;
        }
        if let Some(value) = self.rotation_threshold {
            next.detector.windowed.rotation_threshold = value;
        }
        if let Some(value) = self.windowed_acceleration_threshold {
            next.detector.windowed.acceleration_threshold = value;
        }
        if let Some(value) = self.strategy {
            next.detector.strategy = value;
        }
        next.validate()?;
        Ok(next)
    }

    /// Swaps `config` for the updated copy only when it validates.
    pub fn apply(&self, config: &mut MonitorConfig) -> Result<(), ConfigError> {
        *config = self.applied_to(config)?;
        Ok(())
    }
}

pub const DEFAULT_FALL_SENSITIVITY: u8 = 50;
pub const MAX_FALL_SENSITIVITY: u8 = 100;

/// Maps the user-facing sensitivity (0..=100) to the threshold-delta
/// acceleration threshold. Higher sensitivity means a lower threshold.
pub fn sensitivity_to_threshold(sensitivity: u8) -> f32 {
    let clamped = sensitivity.min(MAX_FALL_SENSITIVITY);
    5.0 - f32::from(clamped) / 20.0
}

impl ThresholdUpdate {
    pub fn from_sensitivity(sensitivity: u8) -> Self {
        Self {
            acceleration_threshold: Some(sensitivity_to_threshold(sensitivity)),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests;
