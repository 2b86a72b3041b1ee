//! Host monitoring for the cooling agent
//!
//! This crate is the hardware-facing leaf of the workspace: CPU load and
//! frequency, named temperature sensors, sysfs thermal zones, battery state
//! and PWM fan devices. Each data source sits behind a small trait so the
//! control core can be driven by fakes in tests.

use anyhow::Result;
use std::path::PathBuf;

pub mod cpu_monitor;
pub mod fan_control;
pub mod power_monitor;
pub mod thermal_monitor;

// Re-export main types
pub use cpu_monitor::{CpuLoad, CpuMonitor};
pub use fan_control::HwmonPwmFan;
pub use power_monitor::{BatteryStatus, PowerMonitor};
pub use thermal_monitor::{ComponentTable, SensorCategory, SensorReading, SysfsThermalZone};

/// Source of CPU utilisation and clock speed. Always produces a value.
pub trait LoadSource: Send {
    fn sample(&mut self) -> CpuLoad;
}

/// A named-sensor collection, such as a hardware monitor's sensor table.
pub trait SensorTable: Send {
    /// Read every sensor currently exposed by the collection.
    fn read_sensors(&mut self) -> Result<Vec<SensorReading>, MonitoringError>;
}

/// An OS thermal zone reporting temperature in decikelvin.
pub trait ThermalZoneReader: Send {
    /// `Ok(None)` means the query succeeded but returned nothing.
    fn read_decikelvin(&mut self) -> Result<Option<f64>, MonitoringError>;
}

/// A single controllable fan.
pub trait FanDevice: Send {
    fn id(&self) -> &str;

    /// Drive the fan at `percent` (0-100) of its maximum.
    fn set_percent(&mut self, percent: f64) -> Result<(), MonitoringError>;
}

/// Default host backends, discovered from the running system
pub struct SystemMonitor {
    pub cpu: CpuMonitor,
    pub sensors: ComponentTable,
    pub thermal_zone: SysfsThermalZone,
    pub power: PowerMonitor,
    pub fans: Vec<HwmonPwmFan>,
}

impl SystemMonitor {
    /// Create a system monitor rooted at `/sys`
    pub fn new() -> Result<Self> {
        Self::with_sysfs_root("/sys")
    }

    /// Create a system monitor reading sysfs below `root`
    pub fn with_sysfs_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let fans = fan_control::discover(root.join("class/hwmon"))?;

        tracing::info!("Discovered {} controllable fan(s) under {}", fans.len(), root.display());

        Ok(Self {
            cpu: CpuMonitor::new(),
            sensors: ComponentTable::new(),
            thermal_zone: SysfsThermalZone::new(root.join("class/thermal")),
            power: PowerMonitor::new(root.join("class/power_supply")),
            fans,
        })
    }
}

/// Error types for host monitoring
#[derive(thiserror::Error, Debug)]
pub enum MonitoringError {
    #[error("sensor table unavailable: {0}")]
    SensorTable(String),

    #[error("thermal zone error: {0}")]
    ThermalZone(String),

    #[error("power supply error: {0}")]
    PowerSupply(String),

    #[error("fan {device}: {reason}")]
    FanDevice { device: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MonitoringError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
