//! Trend band — a volatility band line that flips between support and
//! resistance as price crosses it.
//!
//! The bands are `SMA(close) ± multiplier × ATR`. The tracked line moves to
//! the lower band when close clears the upper band and to the upper band when
//! close falls through the lower band; otherwise it holds its previous value
//! bit for bit. Until `period` bars have been seen the line follows close.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::stats::{RollingStatistics, StatKey};

/// Offset keeping the volatility ratio finite on rangeless history.
const RATIO_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendBandParams {
    pub period: usize,
    pub multiplier: f64,
    /// Scale the multiplier by the ratio of ATR to its longer-run average.
    pub adaptive: bool,
    pub high_volatility: f64,
    pub widen: f64,
    pub low_volatility: f64,
    pub tighten: f64,
}

impl Default for TrendBandParams {
    fn default() -> Self {
        Self {
            period: 10,
            multiplier: 2.5,
            adaptive: true,
            high_volatility: 1.3,
            widen: 1.15,
            low_volatility: 0.7,
            tighten: 0.85,
        }
    }
}

impl TrendBandParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "band.period" });
        }
        for (name, value) in [
            ("band.multiplier", self.multiplier),
            ("band.widen", self.widen),
            ("band.tighten", self.tighten),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

/// The three most recent tracked values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendBandState {
    pub current: f64,
    pub previous: f64,
    pub before_previous: f64,
}

impl TrendBandState {
    fn seeded(value: f64) -> Self {
        Self {
            current: value,
            previous: value,
            before_previous: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.before_previous = self.previous;
        self.previous = self.current;
        self.current = value;
    }

    pub fn flipped(&self) -> bool {
        self.current != self.previous
    }

    /// The line dropped to a lower band: support under an uptrend.
    pub fn flipped_up(&self) -> bool {
        self.current < self.previous
    }

    /// The line jumped to a higher band: resistance over a downtrend.
    pub fn flipped_down(&self) -> bool {
        self.current > self.previous
    }

    /// The line dropped to a lower band on the bar before the current one.
    pub fn flipped_up_previously(&self) -> bool {
        self.previous < self.before_previous
    }

    /// The line jumped to a higher band on the bar before the current one.
    pub fn flipped_down_previously(&self) -> bool {
        self.previous > self.before_previous
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

impl TrendDirection {
    /// Close above the line is up, below is down.
    pub fn of(close: f64, line: f64) -> Self {
        if close > line {
            TrendDirection::Up
        } else if close < line {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            TrendDirection::Up => 1.0,
            TrendDirection::Down => -1.0,
            TrendDirection::Flat => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrendBandTracker {
    params: TrendBandParams,
    state: Option<TrendBandState>,
    upper: f64,
    lower: f64,
    direction: TrendDirection,
}

impl TrendBandTracker {
    pub fn new(params: TrendBandParams) -> Self {
        Self {
            params,
            state: None,
            upper: 0.0,
            lower: 0.0,
            direction: TrendDirection::Flat,
        }
    }

    fn basis_key(&self) -> StatKey {
        StatKey::mean(BarField::Close, self.params.period)
    }

    fn atr_key(&self) -> StatKey {
        StatKey::atr(self.params.period)
    }

    fn long_atr_key(&self) -> StatKey {
        StatKey::mean(BarField::TrueRange, 2 * self.params.period)
    }

    pub fn required_stats(&self) -> Vec<StatKey> {
        let mut keys = vec![self.basis_key(), self.atr_key()];
        if self.params.adaptive {
            keys.push(self.long_atr_key());
        }
        keys
    }

    pub fn warmup_bars(&self) -> usize {
        self.params.period
    }

    /// Effective band multiplier for the current volatility regime.
    pub fn multiplier(&self, stats: &RollingStatistics) -> f64 {
        let p = &self.params;
        if !p.adaptive {
            return p.multiplier;
        }
        let atr = stats.value(&self.atr_key());
        let regime = atr / (stats.value(&self.long_atr_key()) + RATIO_EPSILON);
        if regime > p.high_volatility {
            p.multiplier * p.widen
        } else if regime < p.low_volatility {
            p.multiplier * p.tighten
        } else {
            p.multiplier
        }
    }

    /// Move the line for a newly appended bar. `stats` must already include it.
    pub fn advance(&mut self, bar: &Bar, stats: &RollingStatistics) -> TrendBandState {
        let basis = stats.value(&self.basis_key());
        let width = self.multiplier(stats) * stats.value(&self.atr_key());
        self.upper = basis + width;
        self.lower = basis - width;

        let warm = stats.bars_seen() >= self.params.period;
        let state = match self.state {
            None => TrendBandState::seeded(bar.close),
            Some(mut state) => {
                let next = if !warm {
                    bar.close
                } else if bar.close > self.upper {
                    self.lower
                } else if bar.close < self.lower {
                    self.upper
                } else {
                    state.current
                };
                state.push(next);
                state
            }
        };
        self.state = Some(state);
        self.direction = TrendDirection::of(bar.close, state.current);
        state
    }

    pub fn state(&self) -> Option<TrendBandState> {
        self.state
    }

    pub fn value(&self) -> Option<f64> {
        self.state.map(|s| s.current)
    }

    pub fn direction(&self) -> TrendDirection {
        self.direction
    }

    /// Most recent (upper, lower) bands.
    pub fn bands(&self) -> (f64, f64) {
        (self.upper, self.lower)
    }
}
