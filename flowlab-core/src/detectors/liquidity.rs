//! Liquidity pools and sweeps.
//!
//! A sweep is a bar that printed the extreme of its trailing window on heavy
//! volume and then closed back against the breakout. A pool is a heavy-volume
//! extreme that the following one to three bars closed beyond the opposite
//! side of. Both read as reversals: failed highs are bearish, failed lows
//! bullish.

use serde::{Deserialize, Serialize};

use super::{highest_high, lowest_low, Detector, DetectorFlags, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityParams {
    /// Window a sweep bar must be the extreme of.
    pub sweep_window: usize,
    /// Swing window for pools.
    pub pool_lookback: usize,
    pub volume_period: usize,
    /// Volume ratio above which an extreme counts.
    pub sensitivity: f64,
    pub sweep_weight: f64,
    pub pool_weight: f64,
    /// Bars after a pool bar searched for the failed-break close.
    pub confirm_bars: usize,
    /// Relative distance from a swing level that counts as resting on it.
    pub proximity: f64,
    pub proximity_weight: f64,
}

impl Default for LiquidityParams {
    fn default() -> Self {
        Self {
            sweep_window: 5,
            pool_lookback: 12,
            volume_period: 12,
            sensitivity: 2.0,
            sweep_weight: 15.0,
            pool_weight: 20.0,
            confirm_bars: 3,
            proximity: 0.005,
            proximity_weight: 15.0,
        }
    }
}

impl LiquidityParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, period) in [
            ("liquidity.sweep_window", self.sweep_window),
            ("liquidity.pool_lookback", self.pool_lookback),
            ("liquidity.volume_period", self.volume_period),
            ("liquidity.confirm_bars", self.confirm_bars),
        ] {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod { name });
            }
        }
        if !(self.sensitivity > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "liquidity.sensitivity",
                value: self.sensitivity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LiquiditySweep {
    params: LiquidityParams,
}

impl LiquiditySweep {
    pub fn new(params: LiquidityParams) -> Self {
        Self { params }
    }

    fn volume_key(&self) -> StatKey {
        StatKey::mean(BarField::Volume, self.params.volume_period)
    }

    fn swing_keys(&self) -> (StatKey, StatKey) {
        (
            StatKey::max(BarField::High, self.params.pool_lookback),
            StatKey::min(BarField::Low, self.params.pool_lookback),
        )
    }

    /// Failed breakouts over the short window. Returns (score, any sweep found).
    fn sweeps(&self, series: &BarSeries, avg_volume: f64) -> (f64, bool) {
        let p = &self.params;
        let mut score = 0.0;
        let mut found = false;

        for k in 1..p.sweep_window {
            let Some(bar) = series.ago(k) else { break };
            if bar.range() <= 0.0 {
                continue;
            }
            let vol_ratio = ratio(bar.volume, avg_volume);
            if vol_ratio <= p.sensitivity {
                continue;
            }
            let (Some(hi), Some(lo)) = (
                highest_high(series, k, p.sweep_window),
                lowest_low(series, k, p.sweep_window),
            ) else {
                continue;
            };
            if bar.high == hi && bar.is_down() {
                score -= p.sweep_weight * vol_ratio;
                found = true;
            }
            if bar.low == lo && bar.is_up() {
                score += p.sweep_weight * vol_ratio;
                found = true;
            }
        }
        (score, found)
    }

    /// Heavy-volume swing extremes confirmed by a later close through the
    /// opposite side of the bar.
    fn pools(&self, series: &BarSeries, avg_volume: f64) -> f64 {
        let p = &self.params;
        let mut score = 0.0;

        for k in 1..p.pool_lookback {
            let Some(bar) = series.ago(k) else { break };
            if bar.range() <= 0.0 {
                continue;
            }
            let vol_ratio = ratio(bar.volume, avg_volume);
            if vol_ratio <= p.sensitivity {
                continue;
            }
            let newer = (k.saturating_sub(p.confirm_bars)..k).filter_map(|j| series.ago(j));

            if highest_high(series, k, p.pool_lookback) == Some(bar.high)
                && newer.clone().any(|later| later.close < bar.low)
            {
                score -= p.pool_weight * vol_ratio;
            }
            if lowest_low(series, k, p.pool_lookback) == Some(bar.low)
                && newer.clone().any(|later| later.close > bar.high)
            {
                score += p.pool_weight * vol_ratio;
            }
        }
        score
    }

    /// Current close resting on a swing level with heavy volume. The swing
    /// levels are the rolling extremes as of the previous bar.
    fn proximity(&self, series: &BarSeries, stats: &RollingStatistics, avg_volume: f64) -> f64 {
        let p = &self.params;
        if !series.has(p.pool_lookback) {
            return 0.0;
        }
        let (high_key, low_key) = self.swing_keys();
        let (Some(current), Some(swing_high), Some(swing_low)) = (
            series.ago(0),
            stats.previous(&high_key),
            stats.previous(&low_key),
        ) else {
            return 0.0;
        };
        let vol_ratio = ratio(current.volume, avg_volume);
        if vol_ratio <= p.sensitivity {
            return 0.0;
        }
        let mut score = 0.0;
        if ratio((current.close - swing_high).abs(), swing_high) < p.proximity {
            score -= p.proximity_weight * vol_ratio;
        }
        if ratio((current.close - swing_low).abs(), swing_low) < p.proximity {
            score += p.proximity_weight * vol_ratio;
        }
        score
    }
}

impl Default for LiquiditySweep {
    fn default() -> Self {
        Self::new(LiquidityParams::default())
    }
}

impl Detector for LiquiditySweep {
    fn factor(&self) -> Factor {
        Factor::LiquiditySweep
    }

    fn warmup_bars(&self) -> usize {
        let p = &self.params;
        (2 * p.pool_lookback)
            .max(2 * p.sweep_window)
            .max(p.volume_period)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        let (high, low) = self.swing_keys();
        vec![self.volume_key(), high, low]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let avg_volume = stats.value(&self.volume_key());
        let (sweep_score, sweep) = self.sweeps(series, avg_volume);
        let score = sweep_score
            + self.pools(series, avg_volume)
            + self.proximity(series, stats, avg_volume);

        DetectorOutput::scored(Factor::LiquiditySweep, score.clamp(-100.0, 100.0)).with_flags(
            DetectorFlags {
                sweep,
                ..Default::default()
            },
        )
    }
}
