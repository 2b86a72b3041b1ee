//! Battery and AC adapter monitoring

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::MonitoringError;

/// Power monitor over `/sys/class/power_supply`
pub struct PowerMonitor {
    power_supply_path: PathBuf,
}

/// Battery status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub percent: f64,
    pub power_plugged: bool,
    pub charging: bool,
    pub secs_left: Option<u64>,
}

impl PowerMonitor {
    /// Create new power monitor
    pub fn new(power_supply_path: impl Into<PathBuf>) -> Self {
        Self {
            power_supply_path: power_supply_path.into(),
        }
    }

    /// Read the first battery, `Ok(None)` on machines without one
    pub fn battery(&self) -> Result<Option<BatteryStatus>, MonitoringError> {
        let entries = std::fs::read_dir(&self.power_supply_path)
            .map_err(|e| MonitoringError::io(&self.power_supply_path, e))?;

        let mut supplies: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        supplies.sort();

        let Some(battery) = supplies.iter().find(|path| Self::supply_type(path) == "battery") else {
            return Ok(None);
        };

        let percent = read_trimmed(&battery.join("capacity"))
            .and_then(|capacity| capacity.parse::<f64>().ok())
            .ok_or_else(|| {
                MonitoringError::PowerSupply(format!("{} has no readable capacity", battery.display()))
            })?;

        let status = read_trimmed(&battery.join("status"))
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        let charging = status == "charging";

        let power_plugged = supplies
            .iter()
            .filter(|path| Self::supply_type(path) == "mains")
            .any(|path| read_trimmed(&path.join("online")).as_deref() == Some("1"))
            || charging
            || status == "full";

        let secs_left = if power_plugged {
            None
        } else {
            Self::estimate_secs_left(battery)
        };

        Ok(Some(BatteryStatus {
            percent: percent.clamp(0.0, 100.0),
            power_plugged,
            charging,
            secs_left,
        }))
    }

    fn supply_type(path: &Path) -> String {
        read_trimmed(&path.join("type"))
            .map(|t| t.to_lowercase())
            .unwrap_or_default()
    }

    /// Remaining runtime from energy/power or charge/current pairs
    fn estimate_secs_left(battery: &Path) -> Option<u64> {
        let read_u64 = |name: &str| {
            read_trimmed(&battery.join(name)).and_then(|v| v.parse::<u64>().ok())
        };

        let (remaining, rate) = match (read_u64("energy_now"), read_u64("power_now")) {
            (Some(energy), Some(power)) => (energy, power),
            _ => (read_u64("charge_now")?, read_u64("current_now")?),
        };

        if rate == 0 {
            return None;
        }
        Some(remaining * 3600 / rate)
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_supply(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, value) in files {
            fs::write(dir.join(file), format!("{}\n", value)).unwrap();
        }
    }

    #[test]
    fn test_discharging_battery() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", &[("type", "Mains"), ("online", "0")]);
        write_supply(
            dir.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("capacity", "8"),
                ("status", "Discharging"),
                ("energy_now", "10000000"),
                ("power_now", "20000000"),
            ],
        );

        let monitor = PowerMonitor::new(dir.path());
        let status = monitor.battery().unwrap().unwrap();
        assert_eq!(status.percent, 8.0);
        assert!(!status.power_plugged);
        assert!(!status.charging);
        assert_eq!(status.secs_left, Some(1800));
    }

    #[test]
    fn test_plugged_in_battery_has_no_runtime_estimate() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "ADP1", &[("type", "Mains"), ("online", "1")]);
        write_supply(dir.path(), "BAT1", &[("type", "Battery"), ("capacity", "64"), ("status", "Charging")]);

        let monitor = PowerMonitor::new(dir.path());
        let status = monitor.battery().unwrap().unwrap();
        assert!(status.power_plugged);
        assert!(status.charging);
        assert_eq!(status.secs_left, None);
    }

    #[test]
    fn test_desktop_without_battery() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", &[("type", "Mains"), ("online", "1")]);

        let monitor = PowerMonitor::new(dir.path());
        assert_eq!(monitor.battery().unwrap(), None);
    }
}
