//! Market structure — break of structure (BOS) and change of character (CHoCH).
//!
//! The swing window is the `period` bars before the current one, read from
//! the registered rolling high and low as they stood one bar back; the older
//! window is the `period` bars before that. A break against the direction
//! the older window was trending is a change of character.

use serde::{Deserialize, Serialize};

use super::{highest_high, lowest_low, Detector, DetectorFlags, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureParams {
    pub period: usize,
    pub volume_period: usize,
    pub break_score: f64,
    /// Added in the break direction when the break is also a change of character.
    pub choch_bonus: f64,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            period: 10,
            volume_period: 10,
            break_score: 50.0,
            choch_bonus: 25.0,
        }
    }
}

impl StructureParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "structure.period" });
        }
        if self.volume_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "structure.volume_period" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StructureBreak {
    params: StructureParams,
}

impl StructureBreak {
    pub fn new(params: StructureParams) -> Self {
        Self { params }
    }

    fn volume_key(&self) -> StatKey {
        StatKey::mean(BarField::Volume, self.params.volume_period)
    }

    fn swing_keys(&self) -> (StatKey, StatKey) {
        (
            StatKey::max(BarField::High, self.params.period),
            StatKey::min(BarField::Low, self.params.period),
        )
    }
}

impl Default for StructureBreak {
    fn default() -> Self {
        Self::new(StructureParams::default())
    }
}

impl Detector for StructureBreak {
    fn factor(&self) -> Factor {
        Factor::StructureBreak
    }

    fn warmup_bars(&self) -> usize {
        (2 * self.params.period + 1).max(self.params.volume_period)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        let (high, low) = self.swing_keys();
        vec![self.volume_key(), high, low]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let p = &self.params;
        let neutral = DetectorOutput::neutral(Factor::StructureBreak);
        if !series.has(p.period) {
            return neutral;
        }
        let (high_key, low_key) = self.swing_keys();
        let (Some(current), Some(swing_high), Some(swing_low)) = (
            series.ago(0),
            stats.previous(&high_key),
            stats.previous(&low_key),
        ) else {
            return neutral;
        };
        if current.volume <= stats.value(&self.volume_key()) {
            return neutral;
        }

        let older_high = highest_high(series, p.period + 1, p.period);
        let older_low = lowest_low(series, p.period + 1, p.period);
        let mut flags = DetectorFlags::default();
        let mut score = 0.0;

        if current.close > swing_high {
            flags.break_up = true;
            score += p.break_score;
            // Lower highs before the break: the downtrend just turned.
            if older_high.is_some_and(|older| swing_high < older) {
                flags.change_of_character = true;
                score += p.choch_bonus;
            }
        } else if current.close < swing_low {
            flags.break_down = true;
            score -= p.break_score;
            if older_low.is_some_and(|older| swing_low > older) {
                flags.change_of_character = true;
                score -= p.choch_bonus;
            }
        }

        DetectorOutput::scored(Factor::StructureBreak, score.clamp(-100.0, 100.0)).with_flags(flags)
    }
}
