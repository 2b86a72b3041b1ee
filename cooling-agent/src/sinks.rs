//! Output sinks for the agent binary

use serde::Serialize;
use std::io::Write;
use thermal_control::{DisplayFrame, DisplaySink, EventSink, ThermalEvent};

/// Writes one JSON object per frame and per event to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesSink;

#[derive(Serialize)]
struct Line<'a, T: Serialize> {
    kind: &'static str,
    data: &'a T,
}

impl JsonLinesSink {
    fn emit<T: Serialize>(&self, kind: &'static str, data: &T) {
        let line = match serde_json::to_string(&Line { kind, data }) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to serialise {}: {}", kind, e);
                return;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            tracing::debug!("stdout closed: {}", e);
        }
    }
}

impl DisplaySink for JsonLinesSink {
    fn on_frame(&self, frame: &DisplayFrame) {
        self.emit("frame", frame);
    }
}

impl EventSink for JsonLinesSink {
    fn on_event(&self, event: &ThermalEvent) {
        self.emit("event", event);
    }
}

/// One-line human summary of a frame
pub fn summarize(frame: &DisplayFrame) -> String {
    let prediction = match (frame.predicted_temperature_c, frame.trend) {
        (Some(value), Some(trend)) => format!("{:.1}°C {}", value, trend.arrow()),
        _ => "--".to_string(),
    };
    format!(
        "{:.1}°C{} | CPU {:.0}% | ~{:.1} W | next {} | health {:.0} | fan {:.0}%",
        frame.temperature_c,
        if frame.source_is_synthetic { "*" } else { "" },
        frame.usage_percent,
        frame.power_w,
        prediction,
        frame.health,
        frame.fan_speed
    )
}

/// Logs a compact summary of each frame at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct SummarySink;

impl DisplaySink for SummarySink {
    fn on_frame(&self, frame: &DisplayFrame) {
        tracing::info!("{}", summarize(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use thermal_control::Trend;

    fn frame() -> DisplayFrame {
        DisplayFrame {
            timestamp: chrono::Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            temperature_c: 47.5,
            usage_percent: 33.0,
            power_w: 2.48,
            predicted_temperature_c: Some(49.1),
            trend: Some(Trend::Rising),
            health: 60.0,
            fan_speed: 80.0,
            source_is_synthetic: true,
        }
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            summarize(&frame()),
            "47.5°C* | CPU 33% | ~2.5 W | next 49.1°C ↑ | health 60 | fan 80%"
        );
    }

    #[test]
    fn test_json_line_shape() {
        let frame = frame();
        let value = serde_json::to_value(Line { kind: "frame", data: &frame }).unwrap();
        assert_eq!(value["kind"], "frame");
        assert_eq!(value["data"]["trend"], "rising");
        assert_eq!(value["data"]["source_is_synthetic"], true);
    }
}
