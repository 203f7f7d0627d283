//! Rolling statistics shared by detectors, the trend band and the signal gate.
//!
//! Components declare the aggregates they read as `StatKey`s. The engine
//! registers the union once at construction, then refreshes every aggregate
//! exactly once per bar before anything reads them. Lookups are by key, in
//! the same spirit as looking up a precomputed indicator by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{Atr, BarField, Ema, Extreme, RollingExtremum, Sma, StreamingIndicator};

/// Identity of one rolling aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatKey {
    Mean { field: BarField, period: usize },
    Ema { field: BarField, period: usize },
    /// EMA of the true range.
    Atr { period: usize },
    Max { field: BarField, period: usize },
    Min { field: BarField, period: usize },
}

impl StatKey {
    pub fn mean(field: BarField, period: usize) -> Self {
        StatKey::Mean { field, period }
    }

    pub fn ema(field: BarField, period: usize) -> Self {
        StatKey::Ema { field, period }
    }

    pub fn atr(period: usize) -> Self {
        StatKey::Atr { period }
    }

    pub fn max(field: BarField, period: usize) -> Self {
        StatKey::Max { field, period }
    }

    pub fn min(field: BarField, period: usize) -> Self {
        StatKey::Min { field, period }
    }

    pub fn period(&self) -> usize {
        match *self {
            StatKey::Mean { period, .. }
            | StatKey::Ema { period, .. }
            | StatKey::Atr { period }
            | StatKey::Max { period, .. }
            | StatKey::Min { period, .. } => period,
        }
    }

    fn field(&self) -> BarField {
        match *self {
            StatKey::Mean { field, .. }
            | StatKey::Ema { field, .. }
            | StatKey::Max { field, .. }
            | StatKey::Min { field, .. } => field,
            StatKey::Atr { .. } => BarField::TrueRange,
        }
    }

    /// Human-readable name, e.g. "mean_volume_14".
    pub fn name(&self) -> String {
        let kind = match self {
            StatKey::Mean { .. } => "mean",
            StatKey::Ema { .. } => "ema",
            StatKey::Atr { period } => return format!("atr_{period}"),
            StatKey::Max { .. } => "max",
            StatKey::Min { .. } => "min",
        };
        format!("{kind}_{}_{}", self.field().name(), self.period())
    }

    fn build(&self) -> Box<dyn StreamingIndicator> {
        let name = self.name();
        match *self {
            StatKey::Mean { period, .. } => Box::new(Sma::new(period.max(1)).with_name(name)),
            StatKey::Ema { period, .. } => Box::new(Ema::new(period.max(1)).with_name(name)),
            StatKey::Atr { period } => Box::new(Atr::new(period.max(1))),
            StatKey::Max { period, .. } => Box::new(RollingExtremum::new(period.max(1), Extreme::Max)),
            StatKey::Min { period, .. } => Box::new(RollingExtremum::new(period.max(1), Extreme::Min)),
        }
    }
}

/// Registry of rolling aggregates, refreshed once per appended bar.
pub struct RollingStatistics {
    stats: BTreeMap<StatKey, Box<dyn StreamingIndicator>>,
    /// Values as of the bar before the latest refresh.
    previous: BTreeMap<StatKey, f64>,
    prev_close: Option<f64>,
    bars_seen: usize,
}

impl RollingStatistics {
    pub fn new<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = StatKey>,
    {
        let stats = keys
            .into_iter()
            .map(|key| (key, key.build()))
            .collect();
        Self {
            stats,
            previous: BTreeMap::new(),
            prev_close: None,
            bars_seen: 0,
        }
    }

    /// Update every registered aggregate with the newly appended bar.
    pub fn refresh(&mut self, bar: &Bar) {
        let prev_close = self.prev_close;
        for (key, stat) in self.stats.iter_mut() {
            self.previous.insert(*key, stat.value());
            stat.update(key.field().extract(bar, prev_close));
        }
        self.prev_close = Some(bar.close);
        self.bars_seen += 1;
    }

    /// Current value of an aggregate, `None` if it was never registered.
    pub fn get(&self, key: &StatKey) -> Option<f64> {
        self.stats.get(key).map(|s| s.value())
    }

    /// Value an aggregate had before the latest bar was folded in. For a
    /// rolling max or min this is the extreme of the window ending one bar
    /// back. `None` until two bars have been seen.
    pub fn previous(&self, key: &StatKey) -> Option<f64> {
        if self.bars_seen < 2 {
            return None;
        }
        self.previous.get(key).copied()
    }

    /// Current value, 0 for an unregistered key.
    pub fn value(&self, key: &StatKey) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn keys(&self) -> impl Iterator<Item = &StatKey> {
        self.stats.keys()
    }

    /// `volume / mean(volume, period)`, or 0 when the average is not positive.
    pub fn volume_ratio(&self, volume: f64, period: usize) -> f64 {
        ratio(volume, self.value(&StatKey::mean(BarField::Volume, period)))
    }

    /// +1 when the close EMAs are strictly stacked fast > medium > slow,
    /// -1 when stacked the other way, 0 otherwise.
    pub fn ema_alignment(&self, fast: usize, medium: usize, slow: usize) -> f64 {
        let f = self.value(&StatKey::ema(BarField::Close, fast));
        let m = self.value(&StatKey::ema(BarField::Close, medium));
        let s = self.value(&StatKey::ema(BarField::Close, slow));
        if f > m && m > s {
            1.0
        } else if f < m && m < s {
            -1.0
        } else {
            0.0
        }
    }
}

impl std::fmt::Debug for RollingStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: BTreeMap<String, f64> = self
            .stats
            .iter()
            .map(|(k, s)| (k.name(), s.value()))
            .collect();
        f.debug_struct("RollingStatistics")
            .field("bars_seen", &self.bars_seen)
            .field("values", &values)
            .finish()
    }
}

/// Guarded division: 0 when the denominator is not positive or the result is
/// not finite.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        return 0.0;
    }
    let r = numerator / denominator;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}
