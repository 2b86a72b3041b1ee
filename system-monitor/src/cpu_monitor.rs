//! CPU load and clock monitoring

use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::LoadSource;

/// Clock assumed when the platform does not report a frequency
const FALLBACK_FREQUENCY_MHZ: u64 = 2800;

/// CPU monitor backed by a persistent sysinfo handle
///
/// Usage is computed by sysinfo from the delta between two refreshes, so the
/// handle is kept alive between samples instead of being rebuilt each time.
pub struct CpuMonitor {
    system: System,
}

/// CPU load metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuLoad {
    pub usage_percent: f64,
    pub frequency_mhz: u64,
    pub core_count: usize,
}

impl CpuLoad {
    /// Clock speed in GHz
    pub fn frequency_ghz(&self) -> f64 {
        self.frequency_mhz as f64 / 1000.0
    }
}

impl CpuMonitor {
    /// Create new CPU monitor
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the usage counters so the first sample has a baseline
        system.refresh_cpu_all();
        Self { system }
    }

    /// Get current CPU metrics
    pub fn current(&mut self) -> CpuLoad {
        self.system.refresh_cpu_all();

        let usage_percent = self.system.global_cpu_usage() as f64;
        let frequency_mhz = self.system.cpus()
            .iter()
            .map(|cpu| cpu.frequency())
            .find(|freq| *freq > 0)
            .unwrap_or(FALLBACK_FREQUENCY_MHZ);

        CpuLoad {
            usage_percent: usage_percent.clamp(0.0, 100.0),
            frequency_mhz,
            core_count: self.system.cpus().len(),
        }
    }
}

impl Default for CpuMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSource for CpuMonitor {
    fn sample(&mut self) -> CpuLoad {
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_ghz() {
        let load = CpuLoad { usage_percent: 10.0, frequency_mhz: 3600, core_count: 8 };
        assert!((load.frequency_ghz() - 3.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_within_bounds() {
        let mut monitor = CpuMonitor::new();
        let load = monitor.sample();
        assert!((0.0..=100.0).contains(&load.usage_percent));
        assert!(load.frequency_mhz > 0);
    }
}
