//! Heuristic package power estimate
//!
//! This is a proxy derived from clock, load and temperature, not a reading
//! from a power sensor. The coefficients are uncalibrated and kept as-is.

/// Watts per GHz of fully loaded clock
const FREQUENCY_COEFFICIENT: f64 = 0.1;
/// Watts per degree Celsius
const TEMPERATURE_COEFFICIENT: f64 = 0.05;

/// Estimated power draw in watts
pub fn estimate_power(frequency_ghz: f64, usage_percent: f64, temperature_c: f64) -> f64 {
    frequency_ghz * usage_percent / 100.0 * FREQUENCY_COEFFICIENT + temperature_c * TEMPERATURE_COEFFICIENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_power() {
        // 3.0 GHz at 50% and 40°C: 0.15 + 2.0
        assert!((estimate_power(3.0, 50.0, 40.0) - 2.15).abs() < 1e-12);
        assert!((estimate_power(3.0, 0.0, 0.0)).abs() < 1e-12);
    }

    #[test]
    fn test_load_raises_estimate() {
        assert!(estimate_power(2.4, 90.0, 45.0) > estimate_power(2.4, 10.0, 45.0));
    }
}
