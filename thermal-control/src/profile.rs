//! Cooling profiles and their fan curves

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Offset from the profile base threshold to the critical threshold
pub const CRITICAL_OFFSET_C: f64 = 15.0;

/// Built-in cooling profile, ordered by aggressiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoolingProfile {
    Silent,
    Balanced,
    Performance,
}

/// Shape of a profile's fan response: `max(floor, slope * (t - offset))`
#[derive(Debug, Clone, Copy, PartialEq)]
struct FanCurve {
    floor: f64,
    slope: f64,
    offset_c: f64,
}

impl CoolingProfile {
    pub const ALL: [CoolingProfile; 3] = [Self::Silent, Self::Balanced, Self::Performance];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Balanced => "balanced",
            Self::Performance => "performance",
        }
    }

    /// Warning threshold this profile installs
    pub fn base_threshold_c(&self) -> f64 {
        match self {
            Self::Silent => 18.0,
            Self::Balanced => 20.0,
            Self::Performance => 22.0,
        }
    }

    /// `(warning, critical)` installed on activation
    pub fn limits(&self) -> (f64, f64) {
        let warning = self.base_threshold_c();
        (warning, warning + CRITICAL_OFFSET_C)
    }

    fn curve(&self) -> FanCurve {
        match self {
            Self::Silent => FanCurve { floor: 80.0, slope: 7.0, offset_c: 15.0 },
            Self::Balanced => FanCurve { floor: 90.0, slope: 8.0, offset_c: 18.0 },
            Self::Performance => FanCurve { floor: 100.0, slope: 10.0, offset_c: 20.0 },
        }
    }

    /// Lowest fan percentage this profile will request
    pub fn fan_floor(&self) -> f64 {
        self.curve().floor
    }

    /// Fan percentage for `temperature_c`, clamped to `[floor, 100]`
    pub fn fan_speed(&self, temperature_c: f64) -> f64 {
        let curve = self.curve();
        (curve.slope * (temperature_c - curve.offset_c))
            .max(curve.floor)
            .min(100.0)
    }
}

impl Default for CoolingProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

impl fmt::Display for CoolingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Profile name outside the built-in set
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown cooling profile '{0}' (expected silent, balanced or performance)")]
pub struct UnknownProfile(pub String);

impl FromStr for CoolingProfile {
    type Err = UnknownProfile;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| UnknownProfile(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("silent".parse::<CoolingProfile>(), Ok(CoolingProfile::Silent));
        assert_eq!(" Performance ".parse::<CoolingProfile>(), Ok(CoolingProfile::Performance));
        assert_eq!(
            "turbo".parse::<CoolingProfile>(),
            Err(UnknownProfile("turbo".to_string()))
        );
    }

    #[test]
    fn test_curves() {
        assert_eq!(CoolingProfile::Silent.fan_speed(20.0), 80.0);
        assert_eq!(CoolingProfile::Silent.fan_speed(28.0), 91.0);
        assert_eq!(CoolingProfile::Balanced.fan_speed(25.0), 90.0);
        assert_eq!(CoolingProfile::Balanced.fan_speed(30.0), 96.0);
        assert_eq!(CoolingProfile::Performance.fan_speed(25.0), 100.0);
        assert_eq!(CoolingProfile::Performance.fan_speed(-10.0), 100.0);
    }

    #[test]
    fn test_curves_stay_in_range() {
        for profile in CoolingProfile::ALL {
            for temp in -20..120 {
                let speed = profile.fan_speed(temp as f64);
                assert!(speed >= profile.fan_floor() && speed <= 100.0);
            }
        }
    }

    #[test]
    fn test_aggressiveness_ordering() {
        let [silent, balanced, performance] = CoolingProfile::ALL;
        assert!(silent.fan_floor() < balanced.fan_floor());
        assert!(balanced.fan_floor() < performance.fan_floor());
        assert!(silent.base_threshold_c() < balanced.base_threshold_c());
        assert!(balanced.base_threshold_c() < performance.base_threshold_c());
    }

    #[test]
    fn test_limits() {
        assert_eq!(CoolingProfile::Balanced.limits(), (20.0, 35.0));
        assert_eq!(CoolingProfile::Performance.limits(), (22.0, 37.0));
    }
}
