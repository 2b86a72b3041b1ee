//! Thermal control core for the cooling agent
//!
//! Each tick acquires a CPU temperature through a tiered sensor chain,
//! records it in a bounded history, scores thermal health, fits a short
//! linear trend, escalates on warning and critical temperatures and picks a
//! fan speed. A tokio task drives the ticks; operators talk to it through a
//! command queue and read state and history through shared locks.

pub mod actuator;
pub mod command;
pub mod config;
pub mod control_loop;
pub mod controller;
pub mod events;
pub mod export;
pub mod health;
pub mod history;
pub mod host;
pub mod power;
pub mod predictor;
pub mod profile;
pub mod sensor;
pub mod state;

#[cfg(test)]
mod testing;

// Re-export main types
pub use actuator::{ActuationError, FanActuator, FanBank};
pub use command::{Command, CommandError};
pub use config::{ConfigError, ControlConfig, PressRange};
pub use control_loop::{CommandSender, ControlLoop, ControlLoopHandle, LoopPhase, ShutdownError};
pub use controller::{Controller, Escalation, FanCommand, FanReason, TickReport};
pub use events::{DisplayFrame, DisplaySink, EventSink, LogSink, Observers, ThermalEvent};
pub use health::Thresholds;
pub use history::{HistoryBuffer, HistorySnapshot, Sample};
pub use host::{host_controller, HostController};
pub use predictor::{Forecast, PredictionError, Trend, TrendPredictor};
pub use profile::{CoolingProfile, UnknownProfile};
pub use sensor::{Acquisition, SensorChain, SensorError, SensorSource, SyntheticEstimator, Temperature, TemperatureSource};
pub use state::{ControllerState, QuickCoolSession};

/// Error types for the control loop
#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error("tick failed: {0}")]
    TickFailure(String),

    #[error("control loop is no longer accepting commands")]
    LoopClosed,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
