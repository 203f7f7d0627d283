//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), and plain
//! high-low for the very first bar.
//! ATR is the EMA (alpha = 2/(period+1)) of the true range series.

use crate::domain::Bar;

use super::{Ema, StreamingIndicator};

/// True range of `bar` given the previous bar's close.
pub fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    let hl = bar.high - bar.low;
    match prev_close {
        Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        None => hl,
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    ema: Ema,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            ema: Ema::new(period),
            name: format!("atr_{period}"),
        }
    }
}

impl StreamingIndicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.ema.lookback()
    }

    /// Feed a precomputed true range value.
    fn update(&mut self, value: f64) -> f64 {
        self.ema.update(value)
    }

    fn value(&self) -> f64 {
        self.ema.value()
    }
}
