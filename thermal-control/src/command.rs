//! Operator commands

use serde::{Deserialize, Serialize};

use crate::actuator::ActuationError;
use crate::profile::UnknownProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SetProfile { name: String },
    SetManualFanSpeed { percent: f64 },
    SetFanControlEnabled { enabled: bool },
    SetAutoOptimize { enabled: bool },
    SetThresholds { warning_c: f64, critical_c: f64 },
    /// One activation of the quick-cool gesture
    QuickCoolPress,
    /// Battery ran low while unplugged
    LowBattery { percent: f64 },
    Stop,
}

/// Rejections of operator commands. State is untouched unless noted.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    UnknownProfile(#[from] UnknownProfile),

    #[error("fan speed {0}% is outside 0-100")]
    InvalidSpeed(f64),

    #[error("warning {warning_c}°C must be finite and not above critical {critical_c}°C")]
    InvalidThresholds { warning_c: f64, critical_c: f64 },

    /// The command was applied but driving the fans failed
    #[error("command applied but {0}")]
    Actuation(#[from] ActuationError),
}
