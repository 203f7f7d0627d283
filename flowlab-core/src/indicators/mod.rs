//! Streaming indicator primitives.
//!
//! Every indicator is updated once per bar in O(1) amortised time and never
//! rescans its window. Before `lookback()` values have been seen an indicator
//! reports the aggregate over whatever it has, and 0 when it has seen nothing.

pub mod atr;
pub mod ema;
pub mod extremum;
pub mod sma;

pub use atr::{true_range, Atr};
pub use ema::Ema;
pub use extremum::{Extreme, RollingExtremum};
pub use sma::Sma;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Incremental single-series indicator.
pub trait StreamingIndicator: Send + Sync {
    /// Human-readable name (e.g., "sma_14", "ema_21").
    fn name(&self) -> &str;

    /// Number of values needed before the output is a full-window aggregate.
    fn lookback(&self) -> usize;

    /// Feed the next value and return the updated output.
    fn update(&mut self, value: f64) -> f64;

    /// Latest output (0 before the first update).
    fn value(&self) -> f64;
}

/// The per-bar quantity an aggregate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
    /// high - low
    Range,
    /// Range extended to the previous close.
    TrueRange,
    /// (high + low + close) / 3
    TypicalPrice,
}

impl BarField {
    pub fn extract(self, bar: &Bar, prev_close: Option<f64>) -> f64 {
        match self {
            BarField::Open => bar.open,
            BarField::High => bar.high,
            BarField::Low => bar.low,
            BarField::Close => bar.close,
            BarField::Volume => bar.volume,
            BarField::Range => bar.range(),
            BarField::TrueRange => true_range(bar, prev_close),
            BarField::TypicalPrice => bar.typical_price(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BarField::Open => "open",
            BarField::High => "high",
            BarField::Low => "low",
            BarField::Close => "close",
            BarField::Volume => "volume",
            BarField::Range => "range",
            BarField::TrueRange => "true_range",
            BarField::TypicalPrice => "typical_price",
        }
    }
}
