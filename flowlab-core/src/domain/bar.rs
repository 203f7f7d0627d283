//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar as delivered by the host.
///
/// The engine assigns the logical index on append; the optional date is only
/// carried through to results so the host can line them up with its own axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a bar was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{field} is not finite")]
    NonFinite { field: &'static str },

    #[error("volume {0} is negative")]
    NegativeVolume(f64),

    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },

    #[error("{field} {value} lies outside [{low}, {high}]")]
    OutsideRange {
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date: None,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// OHLCV sanity check: finite fields, low <= open,close <= high, volume >= 0.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field });
            }
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume));
        }
        if self.high < self.low {
            return Err(BarError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        for (field, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(BarError::OutsideRange {
                    field,
                    value,
                    low: self.low,
                    high: self.high,
                });
            }
        }
        Ok(())
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    pub fn is_down(&self) -> bool {
        self.close < self.open
    }

    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Where the close sits inside the bar: 0.0 at the low, 1.0 at the high.
    /// `None` for a rangeless bar.
    pub fn close_position(&self) -> Option<f64> {
        let range = self.range();
        if range > 0.0 {
            Some((self.close - self.low) / range)
        } else {
            None
        }
    }

    /// Estimated net buy/sell pressure: close position mapped to [-1, 1],
    /// weighted by volume. Zero for a rangeless bar.
    pub fn delta(&self) -> f64 {
        self.close_position()
            .map(|pos| (pos - 0.5) * 2.0 * self.volume)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn bar_is_valid() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn bar_rejects_nan() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert_eq!(
            bar.validate(),
            Err(BarError::NonFinite { field: "open" })
        );
    }

    #[test]
    fn bar_rejects_high_below_low() {
        let mut bar = sample_bar();
        bar.high = 97.0;
        assert!(matches!(
            bar.validate(),
            Err(BarError::HighBelowLow { .. })
        ));
    }

    #[test]
    fn bar_rejects_close_above_high() {
        let mut bar = sample_bar();
        bar.close = 106.0;
        assert!(matches!(
            bar.validate(),
            Err(BarError::OutsideRange { field: "close", .. })
        ));
    }

    #[test]
    fn bar_rejects_negative_volume() {
        let mut bar = sample_bar();
        bar.volume = -1.0;
        assert_eq!(bar.validate(), Err(BarError::NegativeVolume(-1.0)));
    }

    #[test]
    fn flat_bar_is_valid_and_neutral() {
        let bar = Bar::new(100.0, 100.0, 100.0, 100.0, 1000.0);
        assert!(bar.validate().is_ok());
        assert_eq!(bar.close_position(), None);
        assert_eq!(bar.delta(), 0.0);
    }

    #[test]
    fn delta_sign_follows_close_position() {
        // Close at the high: full buying pressure.
        let bar = Bar::new(100.0, 110.0, 100.0, 110.0, 500.0);
        assert_eq!(bar.delta(), 500.0);
        // Close at the low: full selling pressure.
        let bar = Bar::new(110.0, 110.0, 100.0, 100.0, 500.0);
        assert_eq!(bar.delta(), -500.0);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar().with_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
