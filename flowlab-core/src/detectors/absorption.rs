//! Absorption — heavy volume that fails to move price in the bar's direction.
//!
//! An up-bar closing near its low on heavy volume means sellers absorbed the
//! buying (negative score); a down-bar closing near its high means buyers
//! absorbed the selling (positive score).

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsorptionParams {
    /// Bars scanned, the current one included.
    pub lookback: usize,
    /// Period of the average volume the ratio is taken against.
    pub volume_period: usize,
    pub strong_ratio: f64,
    pub strong_weight: f64,
    /// Up-bars must close below this fraction of their range (down-bars above `1 - x`).
    pub strong_position: f64,
    pub moderate_ratio: f64,
    pub moderate_weight: f64,
    pub moderate_position: f64,
    /// Body below this fraction of the range counts as a doji.
    pub doji_body: f64,
    pub doji_ratio: f64,
    pub doji_weight: f64,
    pub limit: f64,
}

impl Default for AbsorptionParams {
    fn default() -> Self {
        Self {
            lookback: 14,
            volume_period: 14,
            strong_ratio: 2.5,
            strong_weight: 15.0,
            strong_position: 0.25,
            moderate_ratio: 1.8,
            moderate_weight: 8.0,
            moderate_position: 0.35,
            doji_body: 0.1,
            doji_ratio: 2.0,
            doji_weight: 4.0,
            limit: 150.0,
        }
    }
}

impl AbsorptionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback == 0 {
            return Err(ConfigError::ZeroPeriod { name: "absorption.lookback" });
        }
        if self.volume_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "absorption.volume_period" });
        }
        for (name, value) in [
            ("absorption.strong_ratio", self.strong_ratio),
            ("absorption.moderate_ratio", self.moderate_ratio),
            ("absorption.doji_ratio", self.doji_ratio),
            ("absorption.limit", self.limit),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Absorption {
    params: AbsorptionParams,
}

impl Absorption {
    pub fn new(params: AbsorptionParams) -> Self {
        Self { params }
    }

    fn volume_key(&self) -> StatKey {
        StatKey::mean(BarField::Volume, self.params.volume_period)
    }
}

impl Default for Absorption {
    fn default() -> Self {
        Self::new(AbsorptionParams::default())
    }
}

impl Detector for Absorption {
    fn factor(&self) -> Factor {
        Factor::Absorption
    }

    fn warmup_bars(&self) -> usize {
        self.params.lookback.max(self.params.volume_period)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        vec![self.volume_key()]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let p = &self.params;
        let avg_volume = stats.value(&self.volume_key());
        let mut score = 0.0;

        for bar in (0..p.lookback).filter_map(|k| series.ago(k)) {
            let Some(pos) = bar.close_position() else {
                continue;
            };
            let vol_ratio = ratio(bar.volume, avg_volume);

            let (weight, position) = if vol_ratio > p.strong_ratio {
                (p.strong_weight, p.strong_position)
            } else if vol_ratio > p.moderate_ratio {
                (p.moderate_weight, p.moderate_position)
            } else {
                (0.0, 0.0)
            };
            if weight > 0.0 {
                if bar.is_up() && pos < position {
                    score -= vol_ratio * weight;
                } else if bar.is_down() && pos > 1.0 - position {
                    score += vol_ratio * weight;
                }
            }

            if bar.body() < bar.range() * p.doji_body && vol_ratio > p.doji_ratio {
                let sign = if bar.is_up() { -1.0 } else { 1.0 };
                score += sign * vol_ratio * p.doji_weight;
            }
        }

        DetectorOutput::scored(Factor::Absorption, score.clamp(-p.limit, p.limit))
    }
}
