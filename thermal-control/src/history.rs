//! Bounded rolling history of samples and power estimates

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

use crate::sensor::TemperatureSource;

/// One tick's observation. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub temperature_c: f64,
    pub cpu_usage_percent: f64,
    pub source: TemperatureSource,
}

/// FIFO ring of samples plus a parallel ring of power readings
///
/// Both rings share the capacity and eviction rule but are filled
/// independently, so their lengths may differ.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    power_w: VecDeque<f64>,
    capacity: usize,
}

/// Read-only copy of the buffer, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub samples: Vec<Sample>,
    pub power_w: Vec<f64>,
}

impl HistoryBuffer {
    /// Create new history buffer holding at most `capacity` entries per ring
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            power_w: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: Sample) {
        push_bounded(&mut self.samples, sample, self.capacity);
    }

    pub fn push_power(&mut self, watts: f64) {
        push_bounded(&mut self.power_w, watts, self.capacity);
    }

    /// Append a sample and its power reading together
    pub fn record(&mut self, sample: Sample, watts: f64) {
        self.push(sample);
        self.push_power(watts);
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// The newest `count` temperatures, oldest first
    pub fn recent_temperatures(&self, count: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).map(|sample| sample.temperature_c).collect()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            samples: self.samples.iter().cloned().collect(),
            power_w: self.power_w.iter().copied().collect(),
        }
    }
}

fn push_bounded<T>(ring: &mut VecDeque<T>, value: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while ring.len() >= capacity {
        ring.pop_front();
    }
    ring.push_back(value);
}
