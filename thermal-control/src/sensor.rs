//! Tiered CPU temperature acquisition
//!
//! Tiers are tried in priority order each tick: the hardware monitor's
//! sensor table, then an OS thermal zone, then a synthetic estimate derived
//! from CPU usage. The first tier that produces a value wins; the synthetic
//! tier cannot fail, so acquisition always yields a temperature.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use system_monitor::{SensorCategory, SensorTable, ThermalZoneReader};

/// Baseline of the synthetic estimate at idle
const SYNTHETIC_IDLE_C: f64 = 25.0;
/// Degrees added by the synthetic estimate at full load
const SYNTHETIC_LOAD_SPAN_C: f64 = 15.0;
/// Half-width of the synthetic jitter
const SYNTHETIC_JITTER_C: f64 = 0.5;

/// Where a temperature value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureSource {
    Measured,
    Synthetic,
}

/// A CPU temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value_c: f64,
    pub source: TemperatureSource,
}

impl Temperature {
    pub fn measured(value_c: f64) -> Self {
        Self { value_c, source: TemperatureSource::Measured }
    }

    pub fn synthetic(value_c: f64) -> Self {
        Self { value_c, source: TemperatureSource::Synthetic }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == TemperatureSource::Synthetic
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("{tier} unavailable: {reason}")]
    SensorUnavailable { tier: &'static str, reason: String },
}

impl SensorError {
    fn unavailable(tier: &'static str, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable { tier, reason: reason.into() }
    }
}

/// Usage-driven temperature estimate used when no real sensor answers
pub struct SyntheticEstimator {
    rng: StdRng,
}

impl SyntheticEstimator {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Deterministic jitter for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn estimate(&mut self, usage_percent: f64) -> f64 {
        let jitter = self.rng.gen_range(-SYNTHETIC_JITTER_C..=SYNTHETIC_JITTER_C);
        let raw = SYNTHETIC_IDLE_C + usage_percent.clamp(0.0, 100.0) / 100.0 * SYNTHETIC_LOAD_SPAN_C + jitter;
        (raw * 10.0).round() / 10.0
    }
}

impl Default for SyntheticEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// One tier of the acquisition chain
pub enum SensorSource {
    HardwareMonitor(Box<dyn SensorTable>),
    ThermalZone(Box<dyn ThermalZoneReader>),
    Synthetic(SyntheticEstimator),
}

impl SensorSource {
    pub fn tier_name(&self) -> &'static str {
        match self {
            Self::HardwareMonitor(_) => "hardware monitor",
            Self::ThermalZone(_) => "thermal zone",
            Self::Synthetic(_) => "synthetic estimate",
        }
    }

    /// Read this tier once. `usage_percent` only feeds the synthetic tier.
    pub fn acquire(&mut self, usage_percent: f64) -> Result<Temperature, SensorError> {
        let tier = self.tier_name();
        match self {
            Self::HardwareMonitor(table) => {
                let readings = table
                    .read_sensors()
                    .map_err(|e| SensorError::unavailable(tier, e.to_string()))?;
                readings
                    .iter()
                    .find(|reading| {
                        reading.category == SensorCategory::Temperature
                            && reading.label.to_ascii_lowercase().contains("cpu")
                    })
                    .map(|reading| reading.value)
                    .filter(|value| value.is_finite())
                    .map(Temperature::measured)
                    .ok_or_else(|| {
                        SensorError::unavailable(tier, format!("no CPU temperature among {} sensors", readings.len()))
                    })
            }
            Self::ThermalZone(zone) => {
                let raw = zone
                    .read_decikelvin()
                    .map_err(|e| SensorError::unavailable(tier, e.to_string()))?
                    .ok_or_else(|| SensorError::unavailable(tier, "query returned no value"))?;
                let celsius = raw / 10.0 - 273.15;
                if celsius.is_finite() {
                    Ok(Temperature::measured(celsius))
                } else {
                    Err(SensorError::unavailable(tier, format!("non-finite reading {}", raw)))
                }
            }
            Self::Synthetic(estimator) => Ok(Temperature::synthetic(estimator.estimate(usage_percent))),
        }
    }
}

/// Outcome of one pass over the chain
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub temperature: Temperature,
    /// Failures of the tiers tried before the one that answered
    pub failures: Vec<SensorError>,
}

impl Acquisition {
    /// All tier failures folded into one message, if any tier failed
    pub fn diagnostic(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|failure| failure.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Ordered sensor tiers, always terminated by the synthetic estimate
pub struct SensorChain {
    tiers: Vec<SensorSource>,
    fallback: SyntheticEstimator,
}

impl SensorChain {
    /// Chain of the given real tiers followed by a synthetic estimate
    pub fn new(tiers: Vec<SensorSource>, fallback: SyntheticEstimator) -> Self {
        Self { tiers, fallback }
    }

    /// Chain with no real sensors at all
    pub fn synthetic_only(fallback: SyntheticEstimator) -> Self {
        Self::new(Vec::new(), fallback)
    }

    /// Hardware monitor, then thermal zone, then synthetic
    pub fn standard(
        table: Box<dyn SensorTable>,
        zone: Box<dyn ThermalZoneReader>,
        fallback: SyntheticEstimator,
    ) -> Self {
        Self::new(
            vec![SensorSource::HardwareMonitor(table), SensorSource::ThermalZone(zone)],
            fallback,
        )
    }

    pub fn acquire(&mut self, usage_percent: f64) -> Acquisition {
        let mut failures = Vec::new();

        for tier in self.tiers.iter_mut() {
            match tier.acquire(usage_percent) {
                Ok(temperature) => return Acquisition { temperature, failures },
                Err(e) => {
                    tracing::debug!("Sensor tier failed: {}", e);
                    failures.push(e);
                }
            }
        }

        Acquisition {
            temperature: Temperature::synthetic(self.fallback.estimate(usage_percent)),
            failures,
        }
    }
}
