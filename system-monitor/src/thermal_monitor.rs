//! Temperature sensor access: hardware sensor table and sysfs thermal zones

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::Components;

use crate::{MonitoringError, SensorTable, ThermalZoneReader};

/// Zone types that describe the CPU package, best first
const CPU_ZONE_TYPES: [&str; 5] = ["x86_pkg_temp", "cpu", "tcpu", "soc", "acpitz"];

/// Kind of quantity a named sensor reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorCategory {
    Temperature,
    Load,
    Clock,
    Fan,
    Other(String),
}

/// One entry of a named-sensor collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub label: String,
    pub category: SensorCategory,
    pub value: f64,
}

/// Hardware sensor table backed by sysinfo components (hwmon on Linux)
pub struct ComponentTable {
    components: Components,
}

impl ComponentTable {
    /// Create a table with an immediately refreshed component list
    pub fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
        }
    }
}

impl Default for ComponentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTable for ComponentTable {
    fn read_sensors(&mut self) -> Result<Vec<SensorReading>, MonitoringError> {
        self.components.refresh();

        let readings: Vec<SensorReading> = (&self.components)
            .into_iter()
            .filter(|component| component.temperature().is_finite())
            .map(|component| SensorReading {
                label: component.label().to_string(),
                category: SensorCategory::Temperature,
                value: component.temperature() as f64,
            })
            .collect();

        if readings.is_empty() {
            return Err(MonitoringError::SensorTable("no hardware sensors exposed".to_string()));
        }
        Ok(readings)
    }
}

/// Thermal zone reader over `/sys/class/thermal`
///
/// sysfs reports millidegrees Celsius; readings are normalised to the
/// decikelvin unit used by ACPI thermal zones.
pub struct SysfsThermalZone {
    class_dir: PathBuf,
}

impl SysfsThermalZone {
    pub fn new(class_dir: impl Into<PathBuf>) -> Self {
        Self { class_dir: class_dir.into() }
    }

    /// List `thermal_zoneN` directories ordered by N
    fn zones(&self) -> Result<Vec<PathBuf>, MonitoringError> {
        let entries = std::fs::read_dir(&self.class_dir)
            .map_err(|e| MonitoringError::io(&self.class_dir, e))?;

        let mut zones: Vec<(u32, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let index = name.to_str()?.strip_prefix("thermal_zone")?.parse().ok()?;
                Some((index, entry.path()))
            })
            .collect();
        zones.sort_by_key(|(index, _)| *index);

        Ok(zones.into_iter().map(|(_, path)| path).collect())
    }

    fn zone_rank(zone: &Path) -> usize {
        let zone_type = std::fs::read_to_string(zone.join("type"))
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default();

        CPU_ZONE_TYPES
            .iter()
            .position(|candidate| zone_type.contains(candidate))
            .unwrap_or(CPU_ZONE_TYPES.len())
    }

    fn read_millicelsius(zone: &Path) -> Option<i64> {
        let raw = std::fs::read_to_string(zone.join("temp")).ok()?;
        raw.trim().parse::<i64>().ok()
    }
}

impl ThermalZoneReader for SysfsThermalZone {
    fn read_decikelvin(&mut self) -> Result<Option<f64>, MonitoringError> {
        let mut zones = self.zones()?;
        // Stable sort keeps index order among equally ranked zones
        zones.sort_by_key(|zone| Self::zone_rank(zone));

        for zone in &zones {
            if let Some(millicelsius) = Self::read_millicelsius(zone) {
                // Sanity check temperature reading
                if millicelsius <= 0 || millicelsius >= 150_000 {
                    tracing::debug!("Ignoring implausible reading {} from {}", millicelsius, zone.display());
                    continue;
                }
                return Ok(Some(millicelsius_to_decikelvin(millicelsius)));
            }
        }

        Ok(None)
    }
}

/// Convert a sysfs millidegree reading to decikelvin
pub fn millicelsius_to_decikelvin(millicelsius: i64) -> f64 {
    millicelsius as f64 / 100.0 + 2731.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_zone(root: &Path, index: u32, zone_type: &str, temp: &str) {
        let zone = root.join(format!("thermal_zone{}", index));
        fs::create_dir_all(&zone).unwrap();
        fs::write(zone.join("type"), format!("{}\n", zone_type)).unwrap();
        fs::write(zone.join("temp"), format!("{}\n", temp)).unwrap();
    }

    #[test]
    fn test_conversion_round_trips_through_kelvin() {
        let decikelvin = millicelsius_to_decikelvin(45_000);
        let celsius = decikelvin / 10.0 - 273.15;
        assert!((celsius - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_prefers_cpu_zone() {
        let dir = tempfile::tempdir().unwrap();
        write_zone(dir.path(), 0, "iwlwifi_1", "38000");
        write_zone(dir.path(), 1, "x86_pkg_temp", "52000");

        let mut reader = SysfsThermalZone::new(dir.path());
        let decikelvin = reader.read_decikelvin().unwrap().unwrap();
        assert!((decikelvin / 10.0 - 273.15 - 52.0).abs() < 1e-9);
    }

    #[test]
    fn test_skips_implausible_values() {
        let dir = tempfile::tempdir().unwrap();
        write_zone(dir.path(), 0, "acpitz", "-273000");
        write_zone(dir.path(), 1, "pch_skylake", "41000");

        let mut reader = SysfsThermalZone::new(dir.path());
        let decikelvin = reader.read_decikelvin().unwrap().unwrap();
        assert!((decikelvin / 10.0 - 273.15 - 41.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_class_dir_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SysfsThermalZone::new(dir.path());
        assert_eq!(reader.read_decikelvin().unwrap(), None);
    }

    #[test]
    fn test_missing_class_dir_is_error() {
        let mut reader = SysfsThermalZone::new("/nonexistent/thermal");
        assert!(matches!(reader.read_decikelvin(), Err(MonitoringError::Io { .. })));
    }
}
