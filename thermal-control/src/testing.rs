//! Scriptable backends shared by the unit tests

use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use system_monitor::{CpuLoad, LoadSource, MonitoringError, SensorCategory, SensorReading, SensorTable};

use crate::actuator::{ActuationError, FanActuator};
use crate::config::ControlConfig;
use crate::controller::Controller;
use crate::events::{DisplayFrame, DisplaySink, EventSink, Observers, ThermalEvent};
use crate::sensor::{SensorChain, SensorSource, SyntheticEstimator};

pub(crate) fn at(second: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 1, 12, 0, second).unwrap()
}

struct DialLoad(Arc<Mutex<f64>>);

impl LoadSource for DialLoad {
    fn sample(&mut self) -> CpuLoad {
        CpuLoad { usage_percent: *self.0.lock(), frequency_mhz: 3000, core_count: 4 }
    }
}

/// Reports one CPU sensor, or fails when the dial is `None`
struct DialSensor(Arc<Mutex<Option<f64>>>);

impl SensorTable for DialSensor {
    fn read_sensors(&mut self) -> Result<Vec<SensorReading>, MonitoringError> {
        match *self.0.lock() {
            Some(value) => Ok(vec![SensorReading {
                label: "CPU Package".into(),
                category: SensorCategory::Temperature,
                value,
            }]),
            None => Err(MonitoringError::SensorTable("driver not loaded".into())),
        }
    }
}

struct RecordingActuator {
    commands: Arc<Mutex<Vec<f64>>>,
    failing: Arc<AtomicBool>,
}

impl FanActuator for RecordingActuator {
    fn apply(&mut self, percent: f64) -> Result<(), ActuationError> {
        self.commands.lock().push(percent);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ActuationError::NoControllableDevice { attempted: 0, reasons: Vec::new() });
        }
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    frames: Mutex<Vec<DisplayFrame>>,
    events: Mutex<Vec<ThermalEvent>>,
}

impl DisplaySink for Recorder {
    fn on_frame(&self, frame: &DisplayFrame) {
        self.frames.lock().push(frame.clone());
    }
}

impl EventSink for Recorder {
    fn on_event(&self, event: &ThermalEvent) {
        self.events.lock().push(event.clone());
    }
}

/// A controller wired to dials and recorders
pub(crate) struct Rig {
    pub controller: Controller,
    temperature: Arc<Mutex<Option<f64>>>,
    usage: Arc<Mutex<f64>>,
    failing: Arc<AtomicBool>,
    commands: Arc<Mutex<Vec<f64>>>,
    recorder: Arc<Recorder>,
}

impl Rig {
    pub fn new(config: ControlConfig) -> Self {
        let usage = Arc::new(Mutex::new(20.0));
        Self::build(config, Box::new(DialLoad(usage.clone())), usage)
    }

    /// Same wiring, but CPU load comes from `load` and `set_usage` has no effect
    pub fn with_load(config: ControlConfig, load: Box<dyn LoadSource>) -> Self {
        Self::build(config, load, Arc::new(Mutex::new(20.0)))
    }

    fn build(config: ControlConfig, load: Box<dyn LoadSource>, usage: Arc<Mutex<f64>>) -> Self {
        let temperature = Arc::new(Mutex::new(Some(35.0)));
        let failing = Arc::new(AtomicBool::new(false));
        let commands = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::new(Recorder::default());

        let sensors = SensorChain::new(
            vec![SensorSource::HardwareMonitor(Box::new(DialSensor(temperature.clone())))],
            SyntheticEstimator::with_seed(3),
        );
        let controller = Controller::new(
            config,
            sensors,
            load,
            Box::new(RecordingActuator { commands: commands.clone(), failing: failing.clone() }),
        )
        .unwrap()
        .with_observers(Observers::new().with_display(recorder.clone()).with_events(recorder.clone()))
        .with_rng_seed(11);

        Self { controller, temperature, usage, failing, commands, recorder }
    }

    pub fn set_temperature(&self, value: Option<f64>) {
        *self.temperature.lock() = value;
    }

    pub fn set_usage(&self, value: f64) {
        *self.usage.lock() = value;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every percentage sent to the actuator, including failed attempts
    pub fn commands(&self) -> Vec<f64> {
        self.commands.lock().clone()
    }

    pub fn events(&self) -> Vec<ThermalEvent> {
        self.recorder.events.lock().clone()
    }

    pub fn frames(&self) -> Vec<DisplayFrame> {
        self.recorder.frames.lock().clone()
    }
}
