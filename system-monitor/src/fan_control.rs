//! PWM fan control through the hwmon sysfs interface

use std::path::{Path, PathBuf};

use crate::{FanDevice, MonitoringError};

/// Full-scale hwmon PWM duty value
const PWM_MAX: f64 = 255.0;

/// `pwmN_enable` value selecting manual duty control
const PWM_MODE_MANUAL: &str = "1";

/// A fan driven through `hwmonX/pwmN`
#[derive(Debug, Clone)]
pub struct HwmonPwmFan {
    id: String,
    pwm_path: PathBuf,
    enable_path: PathBuf,
}

impl HwmonPwmFan {
    pub fn new(id: impl Into<String>, pwm_path: impl Into<PathBuf>) -> Self {
        let pwm_path = pwm_path.into();
        let enable_path = PathBuf::from(format!("{}_enable", pwm_path.display()));
        Self {
            id: id.into(),
            pwm_path,
            enable_path,
        }
    }

    pub fn pwm_path(&self) -> &Path {
        &self.pwm_path
    }

    fn write(&self, path: &Path, value: &str) -> Result<(), MonitoringError> {
        std::fs::write(path, value).map_err(|e| MonitoringError::FanDevice {
            device: self.id.clone(),
            reason: format!("write to {} failed: {}", path.display(), e),
        })
    }
}

impl FanDevice for HwmonPwmFan {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_percent(&mut self, percent: f64) -> Result<(), MonitoringError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(MonitoringError::FanDevice {
                device: self.id.clone(),
                reason: format!("duty {}% out of range", percent),
            });
        }

        let duty = percent_to_pwm(percent);
        self.write(&self.enable_path, PWM_MODE_MANUAL)?;
        self.write(&self.pwm_path, &duty.to_string())?;

        tracing::debug!("Fan {} set to {}% (pwm {})", self.id, percent, duty);
        Ok(())
    }
}

/// Map 0-100% onto the 0-255 hwmon duty range
pub fn percent_to_pwm(percent: f64) -> u8 {
    (percent.clamp(0.0, 100.0) * PWM_MAX / 100.0).round() as u8
}

/// Find every `pwmN` below `hwmon_root` that has a matching `pwmN_enable`
///
/// A missing hwmon class directory is not an error: the machine simply has
/// no controllable fans.
pub fn discover(hwmon_root: impl AsRef<Path>) -> anyhow::Result<Vec<HwmonPwmFan>> {
    let hwmon_root = hwmon_root.as_ref();
    let Ok(chips) = std::fs::read_dir(hwmon_root) else {
        return Ok(Vec::new());
    };

    let mut fans = Vec::new();
    for chip in chips.filter_map(|entry| entry.ok()) {
        let chip_path = chip.path();
        let chip_name = chip.file_name().to_string_lossy().to_string();

        let Ok(entries) = std::fs::read_dir(&chip_path) else {
            continue;
        };
        for entry in entries.filter_map(|entry| entry.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_pwm_channel(&name) {
                continue;
            }
            if chip_path.join(format!("{}_enable", name)).exists() {
                fans.push(HwmonPwmFan::new(format!("{}/{}", chip_name, name), entry.path()));
            }
        }
    }

    fans.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(fans)
}

fn is_pwm_channel(name: &str) -> bool {
    name.strip_prefix("pwm")
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_percent_to_pwm() {
        assert_eq!(percent_to_pwm(0.0), 0);
        assert_eq!(percent_to_pwm(50.0), 128);
        assert_eq!(percent_to_pwm(100.0), 255);
    }

    #[test]
    fn test_discover_and_drive() {
        let dir = tempfile::tempdir().unwrap();
        let chip = dir.path().join("hwmon2");
        fs::create_dir_all(&chip).unwrap();
        fs::write(chip.join("pwm1"), "0\n").unwrap();
        fs::write(chip.join("pwm1_enable"), "2\n").unwrap();
        // No enable file: not controllable
        fs::write(chip.join("pwm2"), "0\n").unwrap();
        fs::write(chip.join("fan1_input"), "1200\n").unwrap();

        let mut fans = discover(dir.path()).unwrap();
        assert_eq!(fans.len(), 1);
        assert_eq!(fans[0].id(), "hwmon2/pwm1");

        fans[0].set_percent(80.0).unwrap();
        assert_eq!(fs::read_to_string(chip.join("pwm1")).unwrap(), "204");
        assert_eq!(fs::read_to_string(chip.join("pwm1_enable")).unwrap(), "1");
    }

    #[test]
    fn test_missing_hwmon_root() {
        assert!(discover("/nonexistent/hwmon").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut fan = HwmonPwmFan::new("hwmon0/pwm1", "/nonexistent/pwm1");
        assert!(fan.set_percent(140.0).is_err());
    }
}
