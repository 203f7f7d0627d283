//! Simple Moving Average (SMA).
//!
//! Rolling mean over the last `period` values, kept as a running sum.
//! Before `period` values exist the mean is over what is available.

use std::collections::VecDeque;

use super::StreamingIndicator;

/// Re-sum the window from scratch after this many evictions to keep the
/// running sum from drifting.
const RESUM_INTERVAL: usize = 4096;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    evictions: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            evictions: 0,
            name: format!("sma_{period}"),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of values currently in the window.
    pub fn count(&self) -> usize {
        self.window.len()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.period
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }
}

impl StreamingIndicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, value: f64) -> f64 {
        if self.window.len() == self.period {
            if let Some(leaving) = self.window.pop_front() {
                self.sum -= leaving;
            }
            self.evictions += 1;
        }
        self.window.push_back(value);
        self.sum += value;

        if self.evictions >= RESUM_INTERVAL {
            self.sum = self.window.iter().sum();
            self.evictions = 0;
        }
        self.value()
    }

    fn value(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.sum / self.window.len() as f64
        }
    }
}
