//! Fan actuation across zero or more hardware controllers

use system_monitor::FanDevice;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ActuationError {
    #[error("fan speed {0}% is outside 0-100")]
    InvalidSpeed(f64),

    #[error("no controllable fan accepted the command ({attempted} tried){}", format_reasons(.reasons))]
    NoControllableDevice { attempted: usize, reasons: Vec<String> },

    #[error("actuation failed: {0}")]
    ActuationFailed(String),
}

fn format_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(": {}", reasons.join("; "))
    }
}

/// Something that can drive the machine's fans to a duty percentage
pub trait FanActuator: Send {
    fn apply(&mut self, percent: f64) -> Result<(), ActuationError>;
}

/// Broadcasts each command to every fan device it owns
///
/// A command succeeds when at least one device accepts it.
pub struct FanBank {
    devices: Vec<Box<dyn FanDevice>>,
}

impl FanBank {
    pub fn new(devices: Vec<Box<dyn FanDevice>>) -> Self {
        Self { devices }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl FanActuator for FanBank {
    fn apply(&mut self, percent: f64) -> Result<(), ActuationError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(ActuationError::InvalidSpeed(percent));
        }

        let mut accepted = 0;
        let mut reasons = Vec::new();
        for device in self.devices.iter_mut() {
            match device.set_percent(percent) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    tracing::debug!("Fan {} rejected {}%: {}", device.id(), percent, e);
                    reasons.push(e.to_string());
                }
            }
        }

        if accepted == 0 {
            return Err(ActuationError::NoControllableDevice {
                attempted: self.devices.len(),
                reasons,
            });
        }

        if !reasons.is_empty() {
            tracing::warn!(
                "{} of {} fans rejected {}%: {}",
                reasons.len(),
                self.devices.len(),
                percent,
                reasons.join("; ")
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use system_monitor::MonitoringError;

    struct FakeFan {
        id: String,
        working: bool,
        writes: Arc<Mutex<Vec<f64>>>,
    }

    impl FanDevice for FakeFan {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_percent(&mut self, percent: f64) -> Result<(), MonitoringError> {
            if !self.working {
                return Err(MonitoringError::FanDevice {
                    device: self.id.clone(),
                    reason: "permission denied".into(),
                });
            }
            self.writes.lock().push(percent);
            Ok(())
        }
    }

    fn fan(id: &str, working: bool, writes: &Arc<Mutex<Vec<f64>>>) -> Box<dyn FanDevice> {
        Box::new(FakeFan { id: id.into(), working, writes: writes.clone() })
    }

    #[test]
    fn test_no_devices() {
        let mut bank = FanBank::new(Vec::new());
        assert_eq!(
            bank.apply(50.0),
            Err(ActuationError::NoControllableDevice { attempted: 0, reasons: Vec::new() })
        );
    }

    #[test]
    fn test_invalid_speed_touches_nothing() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let mut bank = FanBank::new(vec![fan("a", true, &writes)]);
        assert_eq!(bank.apply(101.0), Err(ActuationError::InvalidSpeed(101.0)));
        assert!(bank.apply(f64::NAN).is_err());
        assert!(writes.lock().is_empty());
    }

    #[test]
    fn test_partial_success_counts() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let mut bank = FanBank::new(vec![
            fan("broken", false, &writes),
            fan("ok", true, &writes),
            fan("ok2", true, &writes),
        ]);
        assert!(bank.apply(75.0).is_ok());
        assert_eq!(*writes.lock(), vec![75.0, 75.0]);
    }

    #[test]
    fn test_all_devices_reject() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let mut bank = FanBank::new(vec![fan("a", false, &writes), fan("b", false, &writes)]);
        match bank.apply(60.0) {
            Err(ActuationError::NoControllableDevice { attempted, reasons }) => {
                assert_eq!(attempted, 2);
                assert_eq!(reasons.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
