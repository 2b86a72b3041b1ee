//! cooling-agent: keeps the CPU cool by steering fan speed from temperature

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use thermal_control::{
    host_controller, Command, ControlLoop, ControlLoopHandle, CoolingProfile, HostController, LogSink, Observers,
};

mod battery;
mod config;
mod console;
mod export_file;
mod logging;
mod sinks;

use config::AgentConfig;
use console::ConsoleCommand;
use logging::Verbosity;
use sinks::{JsonLinesSink, SummarySink};

#[derive(Parser, Debug)]
#[command(name = "cooling-agent")]
#[command(about = "CPU cooling agent: temperature-driven fan control")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cooling profile to activate at startup
    #[arg(short, long)]
    profile: Option<CoolingProfile>,

    /// Let the controller pick fan speeds
    #[arg(long)]
    auto_optimize: bool,

    /// Drive the fans from the start
    #[arg(long)]
    fan_control: bool,

    /// Root of the sysfs tree to probe
    #[arg(long)]
    sysfs_root: Option<PathBuf>,

    /// Directory for CSV exports
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Export the history when the agent exits
    #[arg(long)]
    export_on_exit: bool,

    /// Print frames and events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Ignore stdin; stop with Ctrl-C only
    #[arg(long)]
    no_console: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::load(path)?,
            None => AgentConfig::default(),
        };

        config.control.auto_optimize |= self.auto_optimize;
        config.control.fan_control_enabled |= self.fan_control;
        if let Some(root) = &self.sysfs_root {
            config.sysfs_root = root.clone();
        }
        if let Some(dir) = &self.export_dir {
            config.export_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn observers(&self) -> Observers {
        if self.json {
            Observers::new()
                .with_display(Arc::new(JsonLinesSink))
                .with_events(Arc::new(JsonLinesSink))
        } else {
            Observers::new()
                .with_display(Arc::new(SummarySink))
                .with_events(Arc::new(LogSink))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    let config = cli.resolve_config()?;
    let HostController { controller, power, fan_count } =
        host_controller(config.control.clone(), &config.sysfs_root)?;
    tracing::info!(
        "Starting with {} fan(s), fan control {}, auto-optimize {}",
        fan_count,
        if config.control.fan_control_enabled { "on" } else { "off" },
        if config.control.auto_optimize { "on" } else { "off" }
    );

    let handle = ControlLoop::spawn(controller.with_observers(cli.observers()), &config.control);
    if let Some(profile) = cli.profile {
        handle.send(Command::SetProfile { name: profile.to_string() })?;
    }

    let battery = tokio::spawn(battery::watch(
        power,
        handle.commands(),
        Duration::from_secs(config.battery_poll_secs),
        config.low_battery_percent,
    ));

    let outcome = run_console(&handle, &config, !cli.no_console).await;
    battery.abort();

    if cli.export_on_exit {
        let path = export_file::target_path(None, &config.export_dir);
        if let Err(e) = export_file::export_to(&handle, &path) {
            tracing::error!("{:#}", e);
        }
    }

    if let Err(e) = handle.shutdown().await {
        tracing::warn!("{}", e);
    }
    outcome
}

/// Serve operator commands until quit, end of input plus Ctrl-C, or Ctrl-C
async fn run_console(handle: &ControlLoopHandle, config: &AgentConfig, interactive: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = interactive;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted, shutting down");
                return Ok(());
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if !handle_line(handle, config, &line)? {
                            return Ok(());
                        }
                    }
                    None => {
                        stdin_open = false;
                        tracing::debug!("stdin closed; press Ctrl-C to stop");
                    }
                }
            }
        }
    }
}

/// Apply one console line. `Ok(false)` means the operator asked to quit.
fn handle_line(handle: &ControlLoopHandle, config: &AgentConfig, line: &str) -> Result<bool> {
    match console::parse_line(line) {
        Ok(None) => {}
        Ok(Some(ConsoleCommand::Control(command))) => handle.send(command)?,
        Ok(Some(ConsoleCommand::Export(path))) => {
            let path = export_file::target_path(path, &config.export_dir);
            match export_file::export_to(handle, &path) {
                Ok(rows) => println!("exported {} samples to {}", rows, path.display()),
                Err(e) => tracing::error!("{:#}", e),
            }
        }
        Ok(Some(ConsoleCommand::Status)) => {
            println!("{}", serde_json::to_string_pretty(&handle.state())?);
        }
        Ok(Some(ConsoleCommand::Help)) => println!("{}", console::HELP),
        Ok(Some(ConsoleCommand::Quit)) => return Ok(false),
        Err(message) => eprintln!("{}", message),
    }
    Ok(true)
}
