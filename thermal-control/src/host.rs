//! Wiring of the controller to the real machine

use anyhow::{Context, Result};
use std::path::Path;
use system_monitor::{FanDevice, PowerMonitor, SystemMonitor};

use crate::actuator::FanBank;
use crate::config::ControlConfig;
use crate::controller::Controller;
use crate::sensor::{SensorChain, SyntheticEstimator};

/// A controller over the host's sensors and fans, plus its battery reader
pub struct HostController {
    pub controller: Controller,
    pub power: PowerMonitor,
    pub fan_count: usize,
}

/// Discover host backends below `sysfs_root` and build a controller over them
pub fn host_controller(config: ControlConfig, sysfs_root: impl AsRef<Path>) -> Result<HostController> {
    let sysfs_root = sysfs_root.as_ref();
    let monitor = SystemMonitor::with_sysfs_root(sysfs_root)
        .with_context(|| format!("Failed to probe host under {}", sysfs_root.display()))?;

    let SystemMonitor { cpu, sensors, thermal_zone, power, fans } = monitor;
    let fan_count = fans.len();
    if fan_count == 0 {
        tracing::warn!("No controllable fans found; fan commands will fail");
    }

    let devices: Vec<Box<dyn FanDevice>> = fans
        .into_iter()
        .map(|fan| Box::new(fan) as Box<dyn FanDevice>)
        .collect();
    let chain = SensorChain::standard(Box::new(sensors), Box::new(thermal_zone), SyntheticEstimator::new());

    let controller = Controller::new(config, chain, Box::new(cpu), Box::new(FanBank::new(devices)))
        .context("Invalid control configuration")?;

    Ok(HostController { controller, power, fan_count })
}
