//! Thermal health scoring

use serde::{Deserialize, Serialize};

/// Health at or below the optimal floor
const HEALTH_OPTIMAL: f64 = 100.0;
/// Health at the warning threshold
const HEALTH_WARNING: f64 = 80.0;
/// Health at the critical threshold
const HEALTH_CRITICAL: f64 = 40.0;
/// Health lost per degree above critical
const CRITICAL_DECAY_PER_DEGREE: f64 = 5.0;

/// Temperature thresholds in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning_c: f64,
    pub critical_c: f64,
    pub optimal_min_c: f64,
    pub optimal_max_c: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_c: 40.0,
            critical_c: 55.0,
            optimal_min_c: 20.0,
            optimal_max_c: 40.0,
        }
    }
}

impl Thresholds {
    /// Thresholds with the warning and critical limits replaced
    pub fn with_limits(self, warning_c: f64, critical_c: f64) -> Self {
        Self {
            warning_c,
            critical_c,
            ..self
        }
    }

    /// Limits are usable when finite and ordered
    pub fn limits_valid(warning_c: f64, critical_c: f64) -> bool {
        warning_c.is_finite() && critical_c.is_finite() && warning_c <= critical_c
    }
}

/// Map a temperature onto a 0-100 health score
///
/// Piecewise linear: 100 at or below `optimal_min`, falling to 80 at
/// `warning`, to 40 at `critical`, then 5 points per degree down to 0.
/// Collapsed ranges return the boundary value instead of dividing by zero.
pub fn score(temperature_c: f64, thresholds: &Thresholds) -> f64 {
    let Thresholds {
        warning_c,
        critical_c,
        optimal_min_c,
        ..
    } = *thresholds;

    let health = if temperature_c <= optimal_min_c {
        HEALTH_OPTIMAL
    } else if temperature_c >= critical_c {
        HEALTH_CRITICAL - (temperature_c - critical_c) * CRITICAL_DECAY_PER_DEGREE
    } else if temperature_c >= warning_c {
        let range = critical_c - warning_c;
        if range <= 0.0 {
            HEALTH_CRITICAL
        } else {
            HEALTH_WARNING - ((temperature_c - warning_c) / range) * (HEALTH_WARNING - HEALTH_CRITICAL)
        }
    } else {
        let range = warning_c - optimal_min_c;
        if range <= 0.0 {
            HEALTH_WARNING
        } else {
            HEALTH_OPTIMAL - ((temperature_c - optimal_min_c) / range) * (HEALTH_OPTIMAL - HEALTH_WARNING)
        }
    };

    health.clamp(0.0, 100.0)
}
