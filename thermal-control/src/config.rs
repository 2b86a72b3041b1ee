//! Control loop configuration

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::health::Thresholds;
use crate::profile::CoolingProfile;

/// Tunables for the controller and its loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_interval_ms: u64,
    /// Multiplier applied to the tick interval after a failed tick
    pub failure_backoff_factor: u32,
    pub history_capacity: usize,
    /// Samples fed to the trend fit
    pub prediction_window: usize,
    /// Index, past the first windowed sample, at which the forecast is read
    pub prediction_horizon: usize,
    pub thresholds: Thresholds,
    pub default_fan_speed: f64,
    pub initial_profile: CoolingProfile,
    pub fan_control_enabled: bool,
    pub auto_optimize: bool,
    pub quick_cool_duration_secs: u64,
    pub quick_cool_presses: PressRange,
    /// Consecutive actuation failures before the actuator is locked out
    pub actuation_failure_limit: u32,
    pub shutdown_timeout_ms: u64,
}

/// Bounds for the number of presses that arm quick-cool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressRange {
    pub min: u32,
    pub max: u32,
}

impl PressRange {
    pub fn as_range(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            failure_backoff_factor: 2,
            history_capacity: 60,
            prediction_window: 10,
            prediction_horizon: 10,
            thresholds: Thresholds::default(),
            default_fan_speed: 80.0,
            initial_profile: CoolingProfile::Balanced,
            fan_control_enabled: false,
            auto_optimize: false,
            quick_cool_duration_secs: 30,
            quick_cool_presses: PressRange { min: 25, max: 35 },
            actuation_failure_limit: 2,
            shutdown_timeout_ms: 1000,
        }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Delay before the next tick after a failure
    pub fn backoff_interval(&self) -> Duration {
        self.tick_interval() * self.failure_backoff_factor.max(1)
    }

    pub fn quick_cool_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quick_cool_duration_secs as i64)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Check the configuration for values the controller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be positive".into()));
        }
        if self.prediction_window < 2 {
            return Err(ConfigError::Invalid(format!(
                "prediction_window must be at least 2, got {}",
                self.prediction_window
            )));
        }
        if self.prediction_window > self.history_capacity {
            return Err(ConfigError::Invalid(format!(
                "prediction_window {} exceeds history_capacity {}",
                self.prediction_window, self.history_capacity
            )));
        }
        if !Thresholds::limits_valid(self.thresholds.warning_c, self.thresholds.critical_c) {
            return Err(ConfigError::Invalid(format!(
                "warning {}°C must not exceed critical {}°C",
                self.thresholds.warning_c, self.thresholds.critical_c
            )));
        }
        if self.thresholds.optimal_min_c > self.thresholds.optimal_max_c {
            return Err(ConfigError::Invalid("optimal_min_c exceeds optimal_max_c".into()));
        }
        if !(0.0..=100.0).contains(&self.default_fan_speed) {
            return Err(ConfigError::Invalid(format!(
                "default_fan_speed {} outside 0-100",
                self.default_fan_speed
            )));
        }
        if self.quick_cool_presses.min == 0 || self.quick_cool_presses.min > self.quick_cool_presses.max {
            return Err(ConfigError::Invalid(format!(
                "quick_cool_presses {}..={} is empty",
                self.quick_cool_presses.min, self.quick_cool_presses.max
            )));
        }
        if self.actuation_failure_limit == 0 {
            return Err(ConfigError::Invalid("actuation_failure_limit must be positive".into()));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid control configuration: {0}")]
    Invalid(String),
}
