//! Battery watcher: forwards low-battery notices to the control loop

use std::sync::Arc;
use std::time::Duration;
use system_monitor::{BatteryStatus, PowerMonitor};
use thermal_control::{Command, CommandSender};

/// Latches so one discharge below the threshold sends one notice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowBatteryLatch {
    tripped: bool,
}

impl LowBatteryLatch {
    /// Returns the command to send, if this reading newly crosses the threshold
    pub fn observe(&mut self, status: &BatteryStatus, threshold_percent: f64) -> Option<Command> {
        let low = !status.power_plugged && status.percent <= threshold_percent;
        if !low {
            self.tripped = false;
            return None;
        }
        if self.tripped {
            return None;
        }
        self.tripped = true;
        Some(Command::LowBattery { percent: status.percent })
    }
}

/// Poll the battery until the control loop goes away
pub async fn watch(power: PowerMonitor, commands: CommandSender, poll: Duration, threshold_percent: f64) {
    let power = Arc::new(power);
    let mut latch = LowBatteryLatch::default();
    let mut interval = tokio::time::interval(poll);

    loop {
        interval.tick().await;

        let reader = power.clone();
        let status = match tokio::task::spawn_blocking(move || reader.battery()).await {
            Ok(Ok(Some(status))) => status,
            Ok(Ok(None)) => {
                tracing::debug!("No battery present; battery watcher exiting");
                return;
            }
            Ok(Err(e)) => {
                tracing::debug!("Battery read failed: {}", e);
                continue;
            }
            Err(e) => {
                tracing::warn!("Battery read task failed: {}", e);
                continue;
            }
        };

        tracing::debug!(
            "Battery {:.0}% ({}){}",
            status.percent,
            if status.power_plugged { "plugged" } else { "on battery" },
            status
                .secs_left
                .map(|secs| format!(", {}h{:02}m left", secs / 3600, secs / 60 % 60))
                .unwrap_or_default()
        );

        if let Some(command) = latch.observe(&status, threshold_percent) {
            if commands.send_now(command).is_err() {
                return;
            }
        }
    }
}
