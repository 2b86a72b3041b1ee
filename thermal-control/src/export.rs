//! CSV export of the retained history

use chrono::{DateTime, Local};
use std::io::{self, Write};

use crate::health::{self, Thresholds};
use crate::history::HistorySnapshot;

pub const CSV_HEADER: &str = "Timestamp,Temperature,CPU Usage,Power Consumption,Fan Speed,System Health";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default export file name for an export taken at `now`
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("cpu_cooling_logs_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Write one row per retained sample
///
/// Power readings are matched to samples by position from the oldest entry;
/// samples without one are written with `0.0`. Health is recomputed against
/// the current thresholds and every row carries the current fan speed.
pub fn write_csv<W: Write>(
    mut writer: W,
    snapshot: &HistorySnapshot,
    fan_speed: f64,
    thresholds: &Thresholds,
) -> io::Result<usize> {
    writeln!(writer, "{}", CSV_HEADER)?;

    for (i, sample) in snapshot.samples.iter().enumerate() {
        let power = snapshot.power_w.get(i).copied().unwrap_or(0.0);
        writeln!(
            writer,
            "{},{:.1},{:.1},{:.1},{:.0},{:.1}",
            sample.timestamp.format(TIMESTAMP_FORMAT),
            sample.temperature_c,
            sample.cpu_usage_percent,
            power,
            fan_speed,
            health::score(sample.temperature_c, thresholds)
        )?;
    }

    writer.flush()?;
    Ok(snapshot.samples.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Sample;
    use crate::sensor::TemperatureSource;
    use chrono::TimeZone;

    #[test]
    fn test_rows_and_missing_power() {
        let snapshot = HistorySnapshot {
            samples: vec![
                Sample {
                    timestamp: Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap(),
                    temperature_c: 47.5,
                    cpu_usage_percent: 12.34,
                    source: TemperatureSource::Measured,
                },
                Sample {
                    timestamp: Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 8).unwrap(),
                    temperature_c: 30.0,
                    cpu_usage_percent: 50.0,
                    source: TemperatureSource::Synthetic,
                },
            ],
            power_w: vec![2.4567],
        };

        let mut out = Vec::new();
        let rows = write_csv(&mut out, &snapshot, 80.0, &Thresholds::default()).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "2024-03-01 09:05:07,47.5,12.3,2.5,80,60.0");
        assert_eq!(lines[2], "2024-03-01 09:05:08,30.0,50.0,0.0,80,90.0");
    }

    #[test]
    fn test_empty_history_writes_header() {
        let mut out = Vec::new();
        let rows = write_csv(&mut out, &HistorySnapshot::default(), 80.0, &Thresholds::default()).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_default_file_name() {
        let now = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).unwrap();
        assert_eq!(default_file_name(now), "cpu_cooling_logs_20241231_235901.csv");
    }
}
