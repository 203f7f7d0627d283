//! Liquidity voids — price skipped between two adjacent bars.
//!
//! Unlike a fair-value gap, which spans three bars, a void is the current bar
//! opening a hole against the bar right before it: its low above the previous
//! high, or its high below the previous low.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityVoidParams {
    /// Period of the average range the void is compared against.
    pub range_period: usize,
    /// Minimum void size as a fraction of the average range.
    pub min_size: f64,
}

impl Default for LiquidityVoidParams {
    fn default() -> Self {
        Self {
            range_period: 10,
            min_size: 0.5,
        }
    }
}

impl LiquidityVoidParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.range_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "liquidity_void.range_period" });
        }
        if !(self.min_size > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "liquidity_void.min_size",
                value: self.min_size,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LiquidityVoid {
    params: LiquidityVoidParams,
}

impl LiquidityVoid {
    pub fn new(params: LiquidityVoidParams) -> Self {
        Self { params }
    }

    fn range_key(&self) -> StatKey {
        StatKey::mean(BarField::Range, self.params.range_period)
    }
}

impl Default for LiquidityVoid {
    fn default() -> Self {
        Self::new(LiquidityVoidParams::default())
    }
}

impl Detector for LiquidityVoid {
    fn factor(&self) -> Factor {
        Factor::LiquidityVoid
    }

    fn warmup_bars(&self) -> usize {
        self.params.range_period.max(2)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        vec![self.range_key()]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let (Some(current), Some(prev)) = (series.ago(0), series.ago(1)) else {
            return DetectorOutput::neutral(Factor::LiquidityVoid);
        };
        let min_size = stats.value(&self.range_key()) * self.params.min_size;

        let void = if current.low > prev.high {
            current.low - prev.high
        } else if current.high < prev.low {
            current.high - prev.low
        } else {
            0.0
        };
        if void.abs() <= min_size {
            return DetectorOutput::neutral(Factor::LiquidityVoid);
        }
        DetectorOutput::scored(Factor::LiquidityVoid, ratio(void, current.close) * 100.0)
    }
}
