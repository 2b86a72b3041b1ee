//! Short-horizon temperature trend prediction

use serde::{Deserialize, Serialize};

/// Forecast deltas smaller than this are reported as steady
const STEADY_EPSILON_C: f64 = 1e-6;

/// Direction of the forecast relative to the latest reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

impl Trend {
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Rising => "↑",
            Self::Falling => "↓",
            Self::Steady => "→",
        }
    }
}

/// Result of one trend fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Fitted value at the horizon index
    pub predicted_c: f64,
    /// Fitted values at indices `0..=horizon`
    pub curve: Vec<f64>,
    pub slope_c_per_tick: f64,
    pub trend: Trend,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("prediction unavailable: {have} of {need} samples")]
    InsufficientHistory { have: usize, need: usize },

    #[error("prediction unavailable: {0}")]
    Degenerate(String),
}

/// Ordinary least squares over the most recent window of temperatures
#[derive(Debug, Clone, Copy)]
pub struct TrendPredictor {
    window: usize,
    horizon: usize,
}

impl TrendPredictor {
    pub fn new(window: usize, horizon: usize) -> Self {
        Self { window, horizon }
    }

    /// Fit the last `window` entries of `temperatures` (oldest first)
    pub fn forecast(&self, temperatures: &[f64]) -> Result<Forecast, PredictionError> {
        if self.window < 2 || temperatures.len() < self.window {
            return Err(PredictionError::InsufficientHistory {
                have: temperatures.len(),
                need: self.window.max(2),
            });
        }

        let recent = &temperatures[temperatures.len() - self.window..];
        if let Some(bad) = recent.iter().find(|t| !t.is_finite()) {
            return Err(PredictionError::Degenerate(format!("non-finite input {}", bad)));
        }

        let n = recent.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = recent.iter().sum::<f64>() / n;

        let (sxy, sxx) = recent
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
                let dx = i as f64 - mean_x;
                (sxy + dx * (y - mean_y), sxx + dx * dx)
            });

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let curve: Vec<f64> = (0..=self.horizon)
            .map(|i| intercept + slope * i as f64)
            .collect();
        let predicted_c = curve[self.horizon];

        if !predicted_c.is_finite() || !slope.is_finite() {
            return Err(PredictionError::Degenerate(format!(
                "fit produced slope {} and value {}",
                slope, predicted_c
            )));
        }

        let latest = recent[recent.len() - 1];
        let delta = predicted_c - latest;
        let trend = if delta > STEADY_EPSILON_C {
            Trend::Rising
        } else if delta < -STEADY_EPSILON_C {
            Trend::Falling
        } else {
            Trend::Steady
        };

        Ok(Forecast {
            predicted_c,
            curve,
            slope_c_per_tick: slope,
            trend,
        })
    }
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_full_window() {
        let predictor = TrendPredictor::default();
        let err = predictor.forecast(&[40.0; 9]).unwrap_err();
        assert_eq!(err, PredictionError::InsufficientHistory { have: 9, need: 10 });
    }

    #[test]
    fn test_identical_values_are_finite_and_steady() {
        let forecast = TrendPredictor::default().forecast(&[42.3; 10]).unwrap();
        assert!((forecast.predicted_c - 42.3).abs() < 1e-9);
        assert_eq!(forecast.trend, Trend::Steady);
        assert_eq!(forecast.curve.len(), 11);
    }

    #[test]
    fn test_linear_rise_extrapolates_one_step() {
        let temps: Vec<f64> = (0..10).map(|i| 6.0 * i as f64).collect();
        let forecast = TrendPredictor::default().forecast(&temps).unwrap();
        assert!((forecast.predicted_c - 60.0).abs() < 1e-9);
        assert!((forecast.slope_c_per_tick - 6.0).abs() < 1e-9);
        assert_eq!(forecast.trend, Trend::Rising);
        assert!((forecast.curve[0] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_uses_only_the_latest_window() {
        let mut temps = vec![90.0; 5];
        temps.extend((0..10).map(|i| 50.0 - i as f64));
        let forecast = TrendPredictor::default().forecast(&temps).unwrap();
        assert!((forecast.predicted_c - 40.0).abs() < 1e-9);
        assert_eq!(forecast.trend, Trend::Falling);
    }

    #[test]
    fn test_non_finite_input() {
        let mut temps = vec![40.0; 10];
        temps[4] = f64::NAN;
        assert!(matches!(
            TrendPredictor::default().forecast(&temps),
            Err(PredictionError::Degenerate(_))
        ));
    }
}
