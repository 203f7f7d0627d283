//! Order blocks — heavy-volume candles whose range is being revisited.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBlockParams {
    /// Oldest offset scanned; offsets start at 2.
    pub lookback: usize,
    pub volume_period: usize,
    pub min_volume_ratio: f64,
    /// A bullish block candle closes below this fraction of its range
    /// (bearish above `1 - x`).
    pub close_position: f64,
    /// Fraction beyond the block edge the current close may sit.
    pub band: f64,
    pub weight: f64,
}

impl Default for OrderBlockParams {
    fn default() -> Self {
        Self {
            lookback: 12,
            volume_period: 12,
            min_volume_ratio: 1.8,
            close_position: 0.35,
            band: 0.025,
            weight: 12.0,
        }
    }
}

impl OrderBlockParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback < 2 {
            return Err(ConfigError::PeriodTooShort {
                name: "order_block.lookback",
                min: 2,
            });
        }
        if self.volume_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "order_block.volume_period" });
        }
        for (name, value) in [
            ("order_block.min_volume_ratio", self.min_volume_ratio),
            ("order_block.band", self.band),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OrderBlock {
    params: OrderBlockParams,
}

impl OrderBlock {
    pub fn new(params: OrderBlockParams) -> Self {
        Self { params }
    }

    fn volume_key(&self) -> StatKey {
        StatKey::mean(BarField::Volume, self.params.volume_period)
    }
}

impl Default for OrderBlock {
    fn default() -> Self {
        Self::new(OrderBlockParams::default())
    }
}

impl Detector for OrderBlock {
    fn factor(&self) -> Factor {
        Factor::OrderBlock
    }

    fn warmup_bars(&self) -> usize {
        (self.params.lookback + 1).max(self.params.volume_period)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        vec![self.volume_key()]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let p = &self.params;
        let Some(current) = series.ago(0) else {
            return DetectorOutput::neutral(Factor::OrderBlock);
        };
        let avg_volume = stats.value(&self.volume_key());
        let close = current.close;
        let mut score = 0.0;

        for block in (2..=p.lookback).filter_map(|k| series.ago(k)) {
            let Some(pos) = block.close_position() else {
                continue;
            };
            let vol_ratio = ratio(block.volume, avg_volume);
            if vol_ratio < p.min_volume_ratio {
                continue;
            }
            if block.is_down()
                && pos < p.close_position
                && close > block.high
                && close < block.high * (1.0 + p.band)
            {
                score += vol_ratio * p.weight;
            }
            if block.is_up()
                && pos > 1.0 - p.close_position
                && close < block.low
                && close > block.low * (1.0 - p.band)
            {
                score -= vol_ratio * p.weight;
            }
        }

        DetectorOutput::scored(Factor::OrderBlock, score.clamp(-100.0, 100.0))
    }
}
