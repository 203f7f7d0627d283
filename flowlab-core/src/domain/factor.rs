//! Scoring factors: one per detector, the two trend inputs and confluence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named input to the composite score.
///
/// Serialised as its snake_case name so it can key TOML tables and JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Factor {
    Absorption,
    LiquiditySweep,
    OrderBlock,
    FairValueGap,
    StructureBreak,
    Divergence,
    VolumeCluster,
    Delta,
    VwapDeviation,
    LiquidityVoid,
    VpocProximity,
    /// Fast/medium/slow EMA ordering.
    EmaAlignment,
    /// Close relative to the tracked trend band.
    TrendBand,
    /// Net count of agreeing detectors.
    Confluence,
}

impl Factor {
    pub const ALL: [Factor; 14] = [
        Factor::Absorption,
        Factor::LiquiditySweep,
        Factor::OrderBlock,
        Factor::FairValueGap,
        Factor::StructureBreak,
        Factor::Divergence,
        Factor::VolumeCluster,
        Factor::Delta,
        Factor::VwapDeviation,
        Factor::LiquidityVoid,
        Factor::VpocProximity,
        Factor::EmaAlignment,
        Factor::TrendBand,
        Factor::Confluence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Factor::Absorption => "absorption",
            Factor::LiquiditySweep => "liquidity_sweep",
            Factor::OrderBlock => "order_block",
            Factor::FairValueGap => "fair_value_gap",
            Factor::StructureBreak => "structure_break",
            Factor::Divergence => "divergence",
            Factor::VolumeCluster => "volume_cluster",
            Factor::Delta => "delta",
            Factor::VwapDeviation => "vwap_deviation",
            Factor::LiquidityVoid => "liquidity_void",
            Factor::VpocProximity => "vpoc_proximity",
            Factor::EmaAlignment => "ema_alignment",
            Factor::TrendBand => "trend_band",
            Factor::Confluence => "confluence",
        }
    }

    /// True for factors produced by a pattern detector.
    pub fn is_detector(self) -> bool {
        !matches!(
            self,
            Factor::EmaAlignment | Factor::TrendBand | Factor::Confluence
        )
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown factor: {0}")]
pub struct UnknownFactor(pub String);

impl FromStr for Factor {
    type Err = UnknownFactor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFactor(s.to_string()))
    }
}

impl TryFrom<String> for Factor {
    type Error = UnknownFactor;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Factor> for &'static str {
    fn from(factor: Factor) -> Self {
        factor.name()
    }
}
