//! Bounded history of CPU utilization samples.

use std::collections::VecDeque;

use serde::Serialize;

use crate::core::migration::stats;

pub const DEFAULT_HISTORY_LENGTH: usize = 30;

/// Ring buffer of utilization fractions, most recent sample first.
///
/// When the buffer is full, a new sample evicts the oldest one.
#[derive(Clone, Debug, Serialize)]
pub struct UtilizationHistory {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl Default for UtilizationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LENGTH)
    }
}

impl UtilizationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Builds history from samples given in chronological order (oldest first).
    pub fn from_chronological(capacity: usize, samples: &[f64]) -> Self {
        let mut history = Self::new(capacity);
        for sample in samples {
            history.push(*sample);
        }
        history
    }

    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_back();
        }
        self.samples.push_front(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity dropping the oldest samples which do not fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.samples.truncate(capacity);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.front().copied()
    }

    /// Returns samples, most recent first.
    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn mean(&self) -> Option<f64> {
        stats::mean(&self.samples())
    }

    pub fn variance(&self) -> Option<f64> {
        stats::variance(&self.samples())
    }

    pub fn median(&self) -> Option<f64> {
        stats::median(&self.samples())
    }

    pub fn mad(&self) -> Option<f64> {
        stats::mad(&self.samples())
    }

    pub fn iqr(&self) -> Option<f64> {
        stats::iqr(&self.samples())
    }
}
