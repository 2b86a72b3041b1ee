//! Shared controller state and the quick-cool session

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::ControlConfig;
use crate::health::Thresholds;
use crate::profile::CoolingProfile;

/// Everything operators can change, plus the controller's own decisions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerState {
    /// Last commanded fan speed, 0-100
    pub fan_speed: f64,
    pub fan_control_enabled: bool,
    pub profile: CoolingProfile,
    pub auto_optimize: bool,
    pub thresholds: Thresholds,
    pub quick_cool: QuickCoolSession,
    pub running: bool,
    /// Set after repeated actuation failures; cleared only by re-enabling fan control
    pub actuation_locked_out: bool,
}

impl ControllerState {
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            fan_speed: config.default_fan_speed,
            fan_control_enabled: config.fan_control_enabled,
            profile: config.initial_profile,
            auto_optimize: config.auto_optimize,
            thresholds: config.thresholds,
            quick_cool: QuickCoolSession::default(),
            running: true,
            actuation_locked_out: false,
        }
    }

    /// Fan control may be driven right now
    pub fn can_actuate(&self) -> bool {
        self.fan_control_enabled && !self.actuation_locked_out
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

/// Quick-cool gesture tracking
///
/// Presses accumulate until a per-cycle target is reached, which arms a
/// forced full-speed override for a fixed duration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuickCoolSession {
    pub active: bool,
    pub started_at: Option<DateTime<Local>>,
    pub duration_secs: u64,
    pub presses: u32,
    /// Presses needed this cycle; drawn on the first press of a cycle
    pub target_presses: Option<u32>,
}

/// What one press did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Counted { remaining: u32 },
    Engaged,
    AlreadyActive,
}

impl QuickCoolSession {
    /// Register one press at `now`. `draw_target` is called once per cycle.
    pub fn press(
        &mut self,
        now: DateTime<Local>,
        duration: chrono::Duration,
        draw_target: impl FnOnce() -> u32,
    ) -> PressOutcome {
        if self.active {
            return PressOutcome::AlreadyActive;
        }

        let target = *self.target_presses.get_or_insert_with(draw_target);
        self.presses += 1;

        if self.presses < target {
            return PressOutcome::Counted { remaining: target - self.presses };
        }

        self.active = true;
        self.started_at = Some(now);
        self.duration_secs = duration.num_seconds().max(0) as u64;
        self.presses = 0;
        self.target_presses = None;
        PressOutcome::Engaged
    }

    pub fn expires_at(&self) -> Option<DateTime<Local>> {
        let started_at = self.started_at?;
        self.active
            .then(|| started_at + chrono::Duration::seconds(self.duration_secs as i64))
    }

    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        self.expires_at().map_or(false, |expiry| now >= expiry)
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 0, second).unwrap()
    }

    #[test]
    fn test_defaults() {
        let state = ControllerState::default();
        assert_eq!(state.fan_speed, 80.0);
        assert!(!state.fan_control_enabled);
        assert_eq!(state.profile, CoolingProfile::Balanced);
        assert!(state.running);
        assert!(!state.can_actuate());
    }

    #[test]
    fn test_press_cycle() {
        let mut session = QuickCoolSession::default();
        let duration = chrono::Duration::seconds(30);
        let mut draws = 0;

        for expected_remaining in (1..3).rev() {
            let outcome = session.press(at(0), duration, || {
                draws += 1;
                3
            });
            assert_eq!(outcome, PressOutcome::Counted { remaining: expected_remaining });
        }
        assert_eq!(session.press(at(1), duration, || 99), PressOutcome::Engaged);
        assert_eq!(draws, 1);
        assert!(session.active);
        assert_eq!(session.press(at(2), duration, || 99), PressOutcome::AlreadyActive);

        assert!(!session.is_expired(at(30)));
        assert!(session.is_expired(at(31)));

        session.clear();
        assert!(!session.active);
        assert!(!session.is_expired(at(59)));
        // New cycle draws a new target
        assert_eq!(session.press(at(40), duration, || 1), PressOutcome::Engaged);
    }
}
