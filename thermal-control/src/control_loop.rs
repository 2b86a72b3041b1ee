//! Background task that ticks the controller on a fixed interval

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::command::Command;
use crate::config::ControlConfig;
use crate::controller::Controller;
use crate::export;
use crate::history::{HistoryBuffer, HistorySnapshot};
use crate::state::ControllerState;
use crate::ControlError;

/// Lifecycle of the loop task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopPhase {
    Stopped = 0,
    Running = 1,
    Stopping = 2,
}

impl LoopPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ShutdownError {
    #[error("control loop did not stop within {0:?}; task leaked")]
    Leaked(Duration),

    #[error("control loop task failed: {0}")]
    TaskFailed(String),
}

/// Cloneable sender for operator commands
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
    wake: Arc<Notify>,
}

impl CommandSender {
    /// Queue a command for the start of the next tick
    pub fn send(&self, command: Command) -> Result<(), ControlError> {
        self.tx.send(command).map_err(|_| ControlError::LoopClosed)
    }

    /// Queue a command and wake the loop so it is applied before the next tick
    ///
    /// The wake does not run an extra tick; sampling stays on the interval.
    pub fn send_now(&self, command: Command) -> Result<(), ControlError> {
        self.send(command)?;
        self.wake.notify_one();
        Ok(())
    }
}

pub struct ControlLoop;

impl ControlLoop {
    /// Spawn the loop onto the current tokio runtime
    pub fn spawn(controller: Controller, config: &ControlConfig) -> ControlLoopHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let phase = Arc::new(AtomicU8::new(LoopPhase::Running as u8));
        let wake = Arc::new(Notify::new());
        let state = controller.state_handle();
        let history = controller.history_handle();

        let task = tokio::spawn(run(
            Arc::new(Mutex::new(controller)),
            rx,
            phase.clone(),
            wake.clone(),
            config.tick_interval(),
            config.backoff_interval(),
        ));

        tracing::info!("Control loop started, ticking every {:?}", config.tick_interval());

        ControlLoopHandle {
            commands: CommandSender { tx, wake },
            state,
            history,
            phase,
            task,
            shutdown_timeout: config.shutdown_timeout(),
        }
    }
}

async fn run(
    controller: Arc<Mutex<Controller>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    phase: Arc<AtomicU8>,
    wake: Arc<Notify>,
    interval: Duration,
    backoff: Duration,
) {
    'ticking: loop {
        let pending = drain(&mut commands);
        let ctrl = controller.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut ctrl = ctrl.lock();
            apply_commands(&mut ctrl, pending);
            if !ctrl.is_running() {
                return Ok(None);
            }
            ctrl.tick().map(Some)
        })
        .await;

        let delay = match outcome {
            Ok(Ok(Some(_report))) => interval,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                tracing::warn!("Control tick failed: {}; backing off {:?}", e, backoff);
                backoff
            }
            Err(e) => {
                tracing::error!("Control tick panicked: {}; backing off {:?}", e, backoff);
                backoff
            }
        };

        // Commands arriving before the deadline are applied without sampling
        let deadline = tokio::time::Instant::now() + delay;
        loop {
            if !controller.lock().is_running() {
                break 'ticking;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = wake.notified() => {
                    let pending = drain(&mut commands);
                    if pending.is_empty() {
                        continue;
                    }
                    let ctrl = controller.clone();
                    let applied = tokio::task::spawn_blocking(move || apply_commands(&mut ctrl.lock(), pending)).await;
                    if let Err(e) = applied {
                        tracing::error!("Command handling panicked: {}", e);
                    }
                }
            }
        }
    }

    phase.store(LoopPhase::Stopping as u8, Ordering::SeqCst);
    tracing::info!("Control loop stopped");
    phase.store(LoopPhase::Stopped as u8, Ordering::SeqCst);
}

fn drain(commands: &mut mpsc::UnboundedReceiver<Command>) -> Vec<Command> {
    let mut pending = Vec::new();
    while let Ok(command) = commands.try_recv() {
        pending.push(command);
    }
    pending
}

fn apply_commands(ctrl: &mut Controller, pending: Vec<Command>) {
    for command in pending {
        if let Err(e) = ctrl.handle_command(command) {
            tracing::warn!("Command rejected: {}", e);
        }
    }
}

/// Owner-side view of a running control loop
pub struct ControlLoopHandle {
    commands: CommandSender,
    state: Arc<RwLock<ControllerState>>,
    history: Arc<RwLock<HistoryBuffer>>,
    phase: Arc<AtomicU8>,
    task: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl ControlLoopHandle {
    pub fn send(&self, command: Command) -> Result<(), ControlError> {
        self.commands.send_now(command)
    }

    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub fn state(&self) -> ControllerState {
        self.state.read().clone()
    }

    pub fn history(&self) -> HistorySnapshot {
        self.history.read().snapshot()
    }

    pub fn phase(&self) -> LoopPhase {
        LoopPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Write the retained history as CSV, returning the number of rows
    pub fn export_csv<W: Write>(&self, writer: W) -> std::io::Result<usize> {
        let snapshot = self.history();
        let state = self.state();
        export::write_csv(writer, &snapshot, state.fan_speed, &state.thresholds)
    }

    /// Stop using the configured shutdown timeout
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        let timeout = self.shutdown_timeout;
        self.stop(timeout).await
    }

    /// Clear the running flag and wait up to `timeout` for the task to finish
    ///
    /// A tick already in progress is allowed to complete.
    pub async fn stop(self, timeout: Duration) -> Result<(), ShutdownError> {
        self.state.write().running = false;
        if self.phase() == LoopPhase::Running {
            self.phase.store(LoopPhase::Stopping as u8, Ordering::SeqCst);
        }
        self.commands.wake.notify_one();

        match tokio::time::timeout(timeout, self.task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ShutdownError::TaskFailed(e.to_string())),
            Err(_) => {
                tracing::error!("Control loop still running after {:?}; leaking task", timeout);
                Err(ShutdownError::Leaked(timeout))
            }
        }
    }
}
