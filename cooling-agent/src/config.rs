//! Agent configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thermal_control::ControlConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub control: ControlConfig,
    /// Seconds between battery checks
    pub battery_poll_secs: u64,
    /// Battery level at or below which, unplugged, the silent profile is forced
    pub low_battery_percent: f64,
    pub export_dir: PathBuf,
    pub sysfs_root: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            battery_poll_secs: 30,
            low_battery_percent: 10.0,
            export_dir: PathBuf::from("."),
            sysfs_root: PathBuf::from("/sys"),
        }
    }
}

impl AgentConfig {
    /// Load a TOML configuration file; absent keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.control.validate().context("Invalid [control] section")?;
        anyhow::ensure!(self.battery_poll_secs > 0, "battery_poll_secs must be positive");
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.low_battery_percent),
            "low_battery_percent {} outside 0-100",
            self.low_battery_percent
        );
        Ok(())
    }
}
