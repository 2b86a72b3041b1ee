//! Display frames, thermal events and the sinks that receive them

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;

use crate::predictor::Trend;

/// Per-tick summary handed to display sinks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFrame {
    pub timestamp: DateTime<Local>,
    pub temperature_c: f64,
    pub usage_percent: f64,
    /// Heuristic estimate, not a measurement
    pub power_w: f64,
    pub predicted_temperature_c: Option<f64>,
    pub trend: Option<Trend>,
    pub health: f64,
    pub fan_speed: f64,
    pub source_is_synthetic: bool,
}

/// Advisory notifications raised by the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ThermalEvent {
    Warning {
        temperature_c: f64,
        warning_c: f64,
    },
    CriticalPrediction {
        /// Predicted value when a forecast was available, else the reading
        temperature_c: f64,
        critical_c: f64,
        predicted: bool,
    },
    LowBattery {
        percent: f64,
    },
    ActuationFailed {
        reason: String,
        locked_out: bool,
    },
    SensorDegraded {
        diagnostic: String,
    },
    QuickCoolEngaged {
        duration_secs: u64,
    },
    QuickCoolExpired,
}

pub trait DisplaySink: Send + Sync {
    fn on_frame(&self, frame: &DisplayFrame);
}

pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ThermalEvent);
}

/// Sink that writes everything to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DisplaySink for LogSink {
    fn on_frame(&self, frame: &DisplayFrame) {
        let predicted = match (frame.predicted_temperature_c, frame.trend) {
            (Some(value), Some(trend)) => format!("{:.1}°C {}", value, trend.arrow()),
            _ => "n/a".to_string(),
        };
        tracing::debug!(
            "{:.1}°C{} | cpu {:.0}% | ~{:.1} W | next {} | health {:.1} | fan {:.0}%",
            frame.temperature_c,
            if frame.source_is_synthetic { " (est.)" } else { "" },
            frame.usage_percent,
            frame.power_w,
            predicted,
            frame.health,
            frame.fan_speed
        );
    }
}

impl EventSink for LogSink {
    fn on_event(&self, event: &ThermalEvent) {
        match event {
            ThermalEvent::Warning { temperature_c, warning_c } => {
                tracing::warn!("Temperature {:.1}°C at or above warning {:.1}°C", temperature_c, warning_c)
            }
            ThermalEvent::CriticalPrediction { temperature_c, critical_c, predicted } => tracing::error!(
                "{} temperature {:.1}°C at or above critical {:.1}°C, forcing fans to 100%",
                if *predicted { "Predicted" } else { "Current" },
                temperature_c,
                critical_c
            ),
            ThermalEvent::LowBattery { percent } => {
                tracing::warn!("Battery at {:.0}%, switching to silent profile", percent)
            }
            ThermalEvent::ActuationFailed { reason, locked_out } => {
                if *locked_out {
                    tracing::warn!("Fan actuation failed, fan control locked out: {}", reason)
                } else {
                    tracing::warn!("Fan actuation failed, fan control disabled: {}", reason)
                }
            }
            ThermalEvent::SensorDegraded { diagnostic } => {
                tracing::warn!("Temperature sensors degraded: {}", diagnostic)
            }
            ThermalEvent::QuickCoolEngaged { duration_secs } => {
                tracing::info!("Quick-cool engaged for {}s", duration_secs)
            }
            ThermalEvent::QuickCoolExpired => tracing::info!("Quick-cool expired"),
        }
    }
}

/// Fan-out to every registered sink
#[derive(Clone, Default)]
pub struct Observers {
    display: Vec<Arc<dyn DisplaySink>>,
    events: Vec<Arc<dyn EventSink>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observers that only log
    pub fn logging() -> Self {
        Self::new().with_display(Arc::new(LogSink)).with_events(Arc::new(LogSink))
    }

    pub fn with_display(mut self, sink: Arc<dyn DisplaySink>) -> Self {
        self.display.push(sink);
        self
    }

    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events.push(sink);
        self
    }

    pub fn frame(&self, frame: &DisplayFrame) {
        for sink in &self.display {
            sink.on_frame(frame);
        }
    }

    pub fn event(&self, event: &ThermalEvent) {
        for sink in &self.events {
            sink.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(ThermalEvent::LowBattery { percent: 8.0 }).unwrap();
        assert_eq!(json["event"], "low_battery");
        assert_eq!(json["percent"], 8.0);

        let json = serde_json::to_value(ThermalEvent::QuickCoolExpired).unwrap();
        assert_eq!(json["event"], "quick_cool_expired");
    }
}
