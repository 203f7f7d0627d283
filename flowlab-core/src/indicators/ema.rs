//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: EMA at the `period`-th value = SMA of the first `period` values.
//! Before the seed the output is the mean of the values seen so far.

use super::StreamingIndicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seen: usize,
    seed_sum: f64,
    current: f64,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            current: 0.0,
            name: format!("ema_{period}"),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// True once the SMA seed has formed.
    pub fn is_seeded(&self) -> bool {
        self.seen >= self.period
    }
}

impl StreamingIndicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, value: f64) -> f64 {
        self.seen += 1;
        if self.seen <= self.period {
            self.seed_sum += value;
            self.current = self.seed_sum / self.seen as f64;
        } else {
            self.current = self.alpha * value + (1.0 - self.alpha) * self.current;
        }
        self.current
    }

    fn value(&self) -> f64 {
        self.current
    }
}
