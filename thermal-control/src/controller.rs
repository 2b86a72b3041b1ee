//! The thermal controller: one tick of sense, score, predict, decide, act

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use system_monitor::LoadSource;

use crate::actuator::{ActuationError, FanActuator};
use crate::command::{Command, CommandError};
use crate::config::ControlConfig;
use crate::events::{DisplayFrame, Observers, ThermalEvent};
use crate::health::{self, Thresholds};
use crate::history::{HistoryBuffer, HistorySnapshot, Sample};
use crate::power::estimate_power;
use crate::predictor::{Forecast, TrendPredictor};
use crate::profile::CoolingProfile;
use crate::sensor::SensorChain;
use crate::state::{ControllerState, PressOutcome};
use crate::ControlError;

/// Fan speed floor of the auto-optimize policy when cool
const AUTO_MIN_SPEED: f64 = 30.0;
/// Auto-optimize speed at the warning threshold
const AUTO_WARNING_BASE: f64 = 70.0;
/// Auto-optimize percent per degree above warning
const AUTO_WARNING_SLOPE: f64 = 2.0;

/// How far the escalation temperature has climbed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Escalation {
    Normal,
    Warning,
    Critical,
}

/// Why the controller picked a fan speed this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FanReason {
    CriticalOverride,
    QuickCool,
    QuickCoolRestore,
    AutoOptimize,
}

impl FanReason {
    /// Overrides that switch fan control on by themselves
    fn forces_control(&self) -> bool {
        matches!(self, Self::CriticalOverride | Self::QuickCool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FanCommand {
    pub percent: f64,
    pub reason: FanReason,
}

/// What a single tick observed and did
#[derive(Debug, Clone)]
pub struct TickReport {
    pub sample: Sample,
    pub power_w: f64,
    pub health: f64,
    pub forecast: Option<Forecast>,
    pub escalation: Escalation,
    pub fan_command: Option<FanCommand>,
    /// `None` when no command was sent to the hardware
    pub actuation: Option<Result<(), ActuationError>>,
    pub diagnostic: Option<String>,
}

/// Auto-optimize fan speed for a temperature and load
pub fn auto_fan_speed(temperature_c: f64, usage_percent: f64, thresholds: &Thresholds) -> f64 {
    if temperature_c >= thresholds.critical_c {
        100.0
    } else if temperature_c >= thresholds.warning_c {
        (AUTO_WARNING_BASE + (temperature_c - thresholds.warning_c) * AUTO_WARNING_SLOPE).min(100.0)
    } else {
        (usage_percent / 2.0).max(AUTO_MIN_SPEED)
    }
}

/// Owns the sensing chain and the actuator; shares state and history
/// with whoever holds the handles.
pub struct Controller {
    config: ControlConfig,
    sensors: SensorChain,
    load: Box<dyn LoadSource>,
    actuator: Box<dyn FanActuator>,
    predictor: TrendPredictor,
    observers: Observers,
    state: Arc<RwLock<ControllerState>>,
    history: Arc<RwLock<HistoryBuffer>>,
    rng: StdRng,
    consecutive_failures: u32,
    last_diagnostic: Option<String>,
}

impl Controller {
    /// Create a new controller from validated configuration
    pub fn new(
        config: ControlConfig,
        sensors: SensorChain,
        load: Box<dyn LoadSource>,
        actuator: Box<dyn FanActuator>,
    ) -> Result<Self, ControlError> {
        config.validate()?;

        Ok(Self {
            predictor: TrendPredictor::new(config.prediction_window, config.prediction_horizon),
            state: Arc::new(RwLock::new(ControllerState::from_config(&config))),
            history: Arc::new(RwLock::new(HistoryBuffer::new(config.history_capacity))),
            observers: Observers::logging(),
            rng: StdRng::from_entropy(),
            consecutive_failures: 0,
            last_diagnostic: None,
            config,
            sensors,
            load,
            actuator,
        })
    }

    /// Replace the default logging observers
    pub fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    /// Seed the draw of quick-cool press targets
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn state_handle(&self) -> Arc<RwLock<ControllerState>> {
        self.state.clone()
    }

    pub fn history_handle(&self) -> Arc<RwLock<HistoryBuffer>> {
        self.history.clone()
    }

    pub fn state(&self) -> ControllerState {
        self.state.read().clone()
    }

    pub fn history(&self) -> HistorySnapshot {
        self.history.read().snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.state.read().running
    }

    pub fn handle_command(&mut self, command: Command) -> Result<(), CommandError> {
        self.handle_command_at(command, Local::now())
    }

    /// Apply one operator command as of `now`
    pub fn handle_command_at(&mut self, command: Command, now: DateTime<Local>) -> Result<(), CommandError> {
        match command {
            Command::SetProfile { name } => {
                let profile: CoolingProfile = name.parse()?;
                self.activate_profile(profile)
            }
            Command::SetManualFanSpeed { percent } => {
                if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
                    return Err(CommandError::InvalidSpeed(percent));
                }
                self.set_fan_speed(percent)
            }
            Command::SetFanControlEnabled { enabled } => {
                if !enabled {
                    self.state.write().fan_control_enabled = false;
                    tracing::info!("Fan control disabled");
                    return Ok(());
                }

                self.consecutive_failures = 0;
                let speed = {
                    let mut state = self.state.write();
                    state.fan_control_enabled = true;
                    state.actuation_locked_out = false;
                    state.fan_speed
                };
                tracing::info!("Fan control enabled at {:.0}%", speed);
                self.drive_fan(speed)?;
                Ok(())
            }
            Command::SetAutoOptimize { enabled } => {
                self.state.write().auto_optimize = enabled;
                tracing::info!("Auto-optimize {}", if enabled { "enabled" } else { "disabled" });
                Ok(())
            }
            Command::SetThresholds { warning_c, critical_c } => {
                if !Thresholds::limits_valid(warning_c, critical_c) {
                    return Err(CommandError::InvalidThresholds { warning_c, critical_c });
                }
                let mut state = self.state.write();
                state.thresholds = state.thresholds.with_limits(warning_c, critical_c);
                tracing::info!("Thresholds set: warning {:.1}°C, critical {:.1}°C", warning_c, critical_c);
                Ok(())
            }
            Command::QuickCoolPress => self.press_quick_cool(now),
            Command::LowBattery { percent } => {
                self.observers.event(&ThermalEvent::LowBattery { percent });
                if self.state.read().profile == CoolingProfile::Silent {
                    return Ok(());
                }
                self.activate_profile(CoolingProfile::Silent)
            }
            Command::Stop => {
                self.state.write().running = false;
                tracing::info!("Stop requested");
                Ok(())
            }
        }
    }

    fn activate_profile(&mut self, profile: CoolingProfile) -> Result<(), CommandError> {
        let (warning_c, critical_c) = profile.limits();
        {
            let mut state = self.state.write();
            state.profile = profile;
            state.thresholds = state.thresholds.with_limits(warning_c, critical_c);
        }
        tracing::info!(
            "Cooling profile '{}' active (warning {:.1}°C, critical {:.1}°C)",
            profile,
            warning_c,
            critical_c
        );

        let latest = self.history.read().latest().map(|sample| sample.temperature_c);
        match latest {
            Some(temperature_c) => self.set_fan_speed(profile.fan_speed(temperature_c)),
            None => Ok(()),
        }
    }

    /// Record `percent` as the fan speed and drive the fans if allowed
    fn set_fan_speed(&mut self, percent: f64) -> Result<(), CommandError> {
        let can_actuate = {
            let mut state = self.state.write();
            state.fan_speed = percent;
            state.can_actuate()
        };
        if can_actuate {
            self.drive_fan(percent)?;
        }
        Ok(())
    }

    fn press_quick_cool(&mut self, now: DateTime<Local>) -> Result<(), CommandError> {
        let duration = self.config.quick_cool_duration();
        let presses = self.config.quick_cool_presses.as_range();
        let rng = &mut self.rng;

        let (outcome, can_actuate) = {
            let mut state = self.state.write();
            let outcome = state.quick_cool.press(now, duration, || rng.gen_range(presses));
            if outcome == PressOutcome::Engaged {
                if !state.actuation_locked_out {
                    state.fan_control_enabled = true;
                }
                state.fan_speed = 100.0;
            }
            (outcome, state.can_actuate())
        };

        match outcome {
            PressOutcome::Engaged => {
                self.observers.event(&ThermalEvent::QuickCoolEngaged {
                    duration_secs: self.config.quick_cool_duration_secs,
                });
                if can_actuate {
                    self.drive_fan(100.0)?;
                }
            }
            PressOutcome::Counted { remaining } => {
                tracing::debug!("Quick-cool press counted, {} to go", remaining)
            }
            PressOutcome::AlreadyActive => tracing::debug!("Quick-cool already active"),
        }
        Ok(())
    }

    /// Send `percent` to the actuator and apply the failure policy
    ///
    /// Every failure turns fan control off. Reaching the configured number of
    /// consecutive failures also locks out the forced-on paths until an
    /// explicit re-enable.
    fn drive_fan(&mut self, percent: f64) -> Result<(), ActuationError> {
        match self.actuator.apply(percent) {
            Ok(()) => {
                self.consecutive_failures = 0;
                Ok(())
            }
            Err(e) => {
                self.consecutive_failures += 1;
                let locked_out = self.consecutive_failures >= self.config.actuation_failure_limit;
                {
                    let mut state = self.state.write();
                    state.fan_control_enabled = false;
                    state.actuation_locked_out |= locked_out;
                }
                self.observers.event(&ThermalEvent::ActuationFailed {
                    reason: e.to_string(),
                    locked_out,
                });
                Err(e)
            }
        }
    }

    pub fn tick(&mut self) -> Result<TickReport, ControlError> {
        self.tick_at(Local::now())
    }

    /// Run one control tick as of `now`
    pub fn tick_at(&mut self, now: DateTime<Local>) -> Result<TickReport, ControlError> {
        let load = self.load.sample();
        if !load.usage_percent.is_finite() {
            return Err(ControlError::TickFailure(format!("CPU usage reading {}", load.usage_percent)));
        }

        let acquisition = self.sensors.acquire(load.usage_percent);
        let diagnostic = acquisition.diagnostic();
        if diagnostic != self.last_diagnostic {
            match &diagnostic {
                Some(message) => self.observers.event(&ThermalEvent::SensorDegraded {
                    diagnostic: message.clone(),
                }),
                None => tracing::info!("Temperature sensors recovered"),
            }
            self.last_diagnostic = diagnostic.clone();
        }

        let temperature = acquisition.temperature;
        if !temperature.value_c.is_finite() {
            return Err(ControlError::TickFailure(format!("temperature reading {}", temperature.value_c)));
        }
        let temperature_c = temperature.value_c;
        let power_w = estimate_power(load.frequency_ghz(), load.usage_percent, temperature_c);

        let sample = Sample {
            timestamp: now,
            temperature_c,
            cpu_usage_percent: load.usage_percent,
            source: temperature.source,
        };
        let recent = {
            let mut history = self.history.write();
            history.record(sample.clone(), power_w);
            history.recent_temperatures(self.config.prediction_window)
        };

        let thresholds = self.state.read().thresholds;
        let health = health::score(temperature_c, &thresholds);
        let forecast = match self.predictor.forecast(&recent) {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        };

        let (escalation_c, predicted) = forecast
            .as_ref()
            .map_or((temperature_c, false), |forecast| (forecast.predicted_c, true));

        let mut fan_command = None;
        let escalation = if escalation_c >= thresholds.critical_c {
            self.observers.event(&ThermalEvent::CriticalPrediction {
                temperature_c: escalation_c,
                critical_c: thresholds.critical_c,
                predicted,
            });
            fan_command = Some(FanCommand { percent: 100.0, reason: FanReason::CriticalOverride });
            Escalation::Critical
        } else if escalation_c >= thresholds.warning_c {
            self.observers.event(&ThermalEvent::Warning {
                temperature_c: escalation_c,
                warning_c: thresholds.warning_c,
            });
            Escalation::Warning
        } else {
            Escalation::Normal
        };

        let (quick_cool_expired, can_actuate, fan_speed) = {
            let mut state = self.state.write();

            let mut expired = false;
            if state.quick_cool.active {
                if state.quick_cool.is_expired(now) {
                    state.quick_cool.clear();
                    expired = true;
                    fan_command.get_or_insert(FanCommand {
                        percent: self.config.default_fan_speed,
                        reason: FanReason::QuickCoolRestore,
                    });
                } else {
                    fan_command.get_or_insert(FanCommand { percent: 100.0, reason: FanReason::QuickCool });
                }
            }

            if let Some(command) = &fan_command {
                if command.reason.forces_control() && !state.actuation_locked_out && !state.fan_control_enabled {
                    tracing::info!("Forcing fan control on ({:?})", command.reason);
                    state.fan_control_enabled = true;
                }
            }

            if fan_command.is_none() && state.auto_optimize && state.fan_control_enabled {
                fan_command = Some(FanCommand {
                    percent: auto_fan_speed(temperature_c, load.usage_percent, &thresholds),
                    reason: FanReason::AutoOptimize,
                });
            }

            if let Some(command) = &fan_command {
                state.fan_speed = command.percent;
            }
            (expired, state.can_actuate(), state.fan_speed)
        };

        if quick_cool_expired {
            self.observers.event(&ThermalEvent::QuickCoolExpired);
        }

        let actuation = match fan_command {
            Some(command) if can_actuate => Some(self.drive_fan(command.percent)),
            _ => None,
        };

        tracing::debug!(
            "Tick: {:.1}°C ({:?}), usage {:.1}%, health {:.1}, {:?}, fan {:?}",
            temperature_c,
            temperature.source,
            load.usage_percent,
            health,
            escalation,
            fan_command
        );

        self.observers.frame(&DisplayFrame {
            timestamp: now,
            temperature_c,
            usage_percent: load.usage_percent,
            power_w,
            predicted_temperature_c: forecast.as_ref().map(|f| f.predicted_c),
            trend: forecast.as_ref().map(|f| f.trend),
            health,
            fan_speed,
            source_is_synthetic: temperature.is_synthetic(),
        });

        Ok(TickReport {
            sample,
            power_w,
            health,
            forecast,
            escalation,
            fan_command,
            actuation,
            diagnostic,
        })
    }
}
