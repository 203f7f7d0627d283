//! Pattern detectors — bar history and rolling statistics in, bounded score out.
//!
//! Detectors are pure: they read the series and the statistics and never
//! mutate engine state. Multi-bar memory comes from scanning the retained
//! window or from a registered `StatKey`, never from fields on the detector.
//!
//! Warm-up is enforced by the engine: a detector is only asked to evaluate
//! once `warmup_bars()` bars have been appended, and its output is neutral
//! before that.

pub mod absorption;
pub mod delta;
pub mod divergence;
pub mod fair_value_gap;
pub mod liquidity;
pub mod liquidity_void;
pub mod order_block;
pub mod structure;
pub mod volume_cluster;
pub mod vpoc;
pub mod vwap;

pub use absorption::{Absorption, AbsorptionParams};
pub use delta::{DeltaParams, DeltaPressure};
pub use divergence::{DeltaDivergence, DivergenceParams};
pub use fair_value_gap::{FairValueGap, FairValueGapParams};
pub use liquidity::{LiquidityParams, LiquiditySweep};
pub use liquidity_void::{LiquidityVoid, LiquidityVoidParams};
pub use order_block::{OrderBlock, OrderBlockParams};
pub use structure::{StructureBreak, StructureParams};
pub use volume_cluster::{VolumeCluster, VolumeClusterParams};
pub use vpoc::{VpocParams, VpocProximity};
pub use vwap::{VwapDeviation, VwapParams};

use serde::{Deserialize, Serialize};

use crate::config::DetectorsConfig;
use crate::domain::{Bar, Factor};
use crate::series::BarSeries;
use crate::stats::{RollingStatistics, StatKey};

/// Auxiliary booleans a detector may raise alongside its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorFlags {
    /// A failed breakout of a recent extreme was found.
    pub sweep: bool,
    /// Close broke above the prior swing high on above-average volume.
    pub break_up: bool,
    /// Close broke below the prior swing low on above-average volume.
    pub break_down: bool,
    /// The break reverses the structure of the older swing window.
    pub change_of_character: bool,
}

/// Output of one detector for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    pub factor: Factor,
    pub score: f64,
    #[serde(default)]
    pub flags: DetectorFlags,
}

impl DetectorOutput {
    pub fn neutral(factor: Factor) -> Self {
        Self {
            factor,
            score: 0.0,
            flags: DetectorFlags::default(),
        }
    }

    pub fn scored(factor: Factor, score: f64) -> Self {
        Self {
            factor,
            score,
            flags: DetectorFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: DetectorFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace a non-finite score with 0.
    pub fn sanitized(mut self) -> Self {
        if !self.score.is_finite() {
            self.score = 0.0;
        }
        self
    }
}

/// Trait for pattern detectors.
///
/// # Causality
/// `evaluate` may only read bars already appended to the series; the most
/// recent bar is `series.ago(0)`.
pub trait Detector: Send + Sync {
    /// Factor this detector feeds.
    fn factor(&self) -> Factor;

    /// Number of appended bars required before the detector may claim a pattern.
    fn warmup_bars(&self) -> usize;

    /// Rolling aggregates this detector reads.
    fn required_stats(&self) -> Vec<StatKey>;

    /// Score the most recent bar.
    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput;
}

/// Build the enabled detectors, in a fixed order.
pub fn build_detectors(config: &DetectorsConfig) -> Vec<Box<dyn Detector>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
    if let Some(p) = &config.absorption {
        detectors.push(Box::new(Absorption::new(p.clone())));
    }
    if let Some(p) = &config.liquidity {
        detectors.push(Box::new(LiquiditySweep::new(p.clone())));
    }
    if let Some(p) = &config.order_block {
        detectors.push(Box::new(OrderBlock::new(p.clone())));
    }
    if let Some(p) = &config.fair_value_gap {
        detectors.push(Box::new(FairValueGap::new(p.clone())));
    }
    if let Some(p) = &config.structure {
        detectors.push(Box::new(StructureBreak::new(p.clone())));
    }
    if let Some(p) = &config.divergence {
        detectors.push(Box::new(DeltaDivergence::new(p.clone())));
    }
    if let Some(p) = &config.volume_cluster {
        detectors.push(Box::new(VolumeCluster::new(p.clone())));
    }
    if let Some(p) = &config.delta {
        detectors.push(Box::new(DeltaPressure::new(p.clone())));
    }
    if let Some(p) = &config.vwap {
        detectors.push(Box::new(VwapDeviation::new(p.clone())));
    }
    if let Some(p) = &config.liquidity_void {
        detectors.push(Box::new(LiquidityVoid::new(p.clone())));
    }
    if let Some(p) = &config.vpoc {
        detectors.push(Box::new(VpocProximity::new(p.clone())));
    }
    detectors
}

/// Highest high over bars `from..from+count` back (0 = most recent).
pub(crate) fn highest_high(series: &BarSeries, from: usize, count: usize) -> Option<f64> {
    window(series, from, count).map(|bars| bars.map(|b| b.high).fold(f64::MIN, f64::max))
}

/// Lowest low over bars `from..from+count` back (0 = most recent).
pub(crate) fn lowest_low(series: &BarSeries, from: usize, count: usize) -> Option<f64> {
    window(series, from, count).map(|bars| bars.map(|b| b.low).fold(f64::MAX, f64::min))
}

/// Bars `from..from+count` back, or `None` if any of them is not retained.
pub(crate) fn window(
    series: &BarSeries,
    from: usize,
    count: usize,
) -> Option<impl Iterator<Item = &Bar> + '_> {
    if count == 0 || !series.has(from + count - 1) {
        return None;
    }
    Some((from..from + count).filter_map(move |k| series.ago(k)))
}
