//! Named configuration presets.
//!
//! Each preset is a complete `EngineConfig`: a detector subset, weights whose
//! caps sum to 100, and signal rules. They all drive the same engine.

use std::collections::BTreeMap;
use std::fmt;

use crate::band::TrendBandParams;
use crate::config::{DetectorsConfig, EmaParams, EngineConfig};
use crate::detectors::{
    AbsorptionParams, DeltaParams, DivergenceParams, FairValueGapParams, LiquidityParams,
    LiquidityVoidParams, OrderBlockParams, StructureParams, VolumeClusterParams, VpocParams,
    VwapParams,
};
use crate::domain::Factor;
use crate::scoring::FactorWeight;
use crate::signal::{SignalRules, TrendGate};

// ─── Preset ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    /// Default detector set with net confluence; EMA stack and band gate.
    #[default]
    Balanced,
    /// Sweeps and order blocks lead; short sweep window, VPOC proximity.
    LiquidityHunter,
    /// Structure breaks, gaps and voids lead; both trend inputs must agree.
    StructureSentinel,
    /// Delta, VWAP deviation and absorption lead; fresh band flips gate.
    InstitutionalFlow,
    /// Volume clusters and absorption, band gate only.
    ClusterAbsorption,
}

/// Normalization and confluence floor per factor; presets only vary the cap.
fn scaled(factor: Factor, cap: f64) -> (Factor, FactorWeight) {
    let (normalization, floor) = match factor {
        Factor::EmaAlignment | Factor::TrendBand => (1.0, 0.0),
        Factor::Delta => (5000.0, 200.0),
        Factor::Absorption => (6.0, 10.0),
        Factor::LiquiditySweep => (8.0, 0.0),
        Factor::OrderBlock => (6.0, 0.0),
        Factor::FairValueGap => (1.0, 0.0),
        Factor::StructureBreak => (4.0, 0.0),
        Factor::Divergence => (5.0, 0.0),
        Factor::VolumeCluster => (10.0, 20.0),
        Factor::VwapDeviation => (0.2, 0.5),
        Factor::LiquidityVoid => (1.0, 0.0),
        Factor::VpocProximity => (10.0, 0.0),
        Factor::Confluence => (0.5, 0.0),
    };
    (factor, FactorWeight::new(cap, normalization, floor))
}

fn weights(caps: &[(Factor, f64)]) -> BTreeMap<Factor, FactorWeight> {
    caps.iter().map(|&(factor, cap)| scaled(factor, cap)).collect()
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Balanced,
        Preset::LiquidityHunter,
        Preset::StructureSentinel,
        Preset::InstitutionalFlow,
        Preset::ClusterAbsorption,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Balanced => "balanced",
            Preset::LiquidityHunter => "liquidity_hunter",
            Preset::StructureSentinel => "structure_sentinel",
            Preset::InstitutionalFlow => "institutional_flow",
            Preset::ClusterAbsorption => "cluster_absorption",
        }
    }

    /// Case-insensitive; `-` and `_` are interchangeable.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|p| p.name() == wanted)
    }

    pub fn config(self) -> EngineConfig {
        match self {
            Preset::Balanced => EngineConfig::default(),
            Preset::LiquidityHunter => EngineConfig {
                detectors: DetectorsConfig {
                    liquidity: Some(LiquidityParams {
                        sweep_window: 5,
                        pool_lookback: 12,
                        sensitivity: 1.8,
                        ..Default::default()
                    }),
                    order_block: Some(OrderBlockParams::default()),
                    absorption: Some(AbsorptionParams::default()),
                    structure: Some(StructureParams::default()),
                    delta: Some(DeltaParams::default()),
                    vpoc: Some(VpocParams::default()),
                    ..DetectorsConfig::none()
                },
                weights: weights(&[
                    (Factor::LiquiditySweep, 25.0),
                    (Factor::OrderBlock, 15.0),
                    (Factor::Absorption, 10.0),
                    (Factor::VpocProximity, 10.0),
                    (Factor::Delta, 10.0),
                    (Factor::StructureBreak, 10.0),
                    (Factor::EmaAlignment, 10.0),
                    (Factor::TrendBand, 10.0),
                ]),
                signal: SignalRules {
                    triggers: vec![Factor::LiquiditySweep, Factor::OrderBlock],
                    ..Default::default()
                },
                ..Default::default()
            },
            Preset::StructureSentinel => EngineConfig {
                band: TrendBandParams {
                    multiplier: 2.0,
                    ..Default::default()
                },
                detectors: DetectorsConfig {
                    structure: Some(StructureParams {
                        period: 20,
                        volume_period: 20,
                        ..Default::default()
                    }),
                    fair_value_gap: Some(FairValueGapParams::default()),
                    order_block: Some(OrderBlockParams::default()),
                    divergence: Some(DivergenceParams::default()),
                    delta: Some(DeltaParams::default()),
                    liquidity_void: Some(LiquidityVoidParams::default()),
                    ..DetectorsConfig::none()
                },
                weights: weights(&[
                    (Factor::StructureBreak, 30.0),
                    (Factor::FairValueGap, 10.0),
                    (Factor::LiquidityVoid, 10.0),
                    (Factor::OrderBlock, 15.0),
                    (Factor::Divergence, 10.0),
                    (Factor::Delta, 5.0),
                    (Factor::EmaAlignment, 10.0),
                    (Factor::TrendBand, 10.0),
                ]),
                signal: SignalRules {
                    trend_gate: TrendGate::Both,
                    triggers: vec![Factor::StructureBreak],
                    ..Default::default()
                },
                ..Default::default()
            },
            Preset::InstitutionalFlow => EngineConfig {
                ema: EmaParams {
                    fast: 8,
                    medium: 21,
                    slow: 55,
                    ..Default::default()
                },
                detectors: DetectorsConfig {
                    delta: Some(DeltaParams::default()),
                    vwap: Some(VwapParams::default()),
                    absorption: Some(AbsorptionParams::default()),
                    divergence: Some(DivergenceParams::default()),
                    volume_cluster: Some(VolumeClusterParams::default()),
                    ..DetectorsConfig::none()
                },
                weights: weights(&[
                    (Factor::Delta, 20.0),
                    (Factor::VwapDeviation, 15.0),
                    (Factor::Absorption, 20.0),
                    (Factor::Divergence, 10.0),
                    (Factor::VolumeCluster, 10.0),
                    (Factor::EmaAlignment, 15.0),
                    (Factor::TrendBand, 10.0),
                ]),
                signal: SignalRules {
                    volume_ratio_threshold: 1.8,
                    trend_gate: TrendGate::BandFlip,
                    triggers: vec![Factor::Absorption, Factor::Delta],
                    ..Default::default()
                },
                ..Default::default()
            },
            Preset::ClusterAbsorption => EngineConfig {
                ema: EmaParams::disabled(),
                detectors: DetectorsConfig {
                    volume_cluster: Some(VolumeClusterParams {
                        lookback: 20,
                        ..Default::default()
                    }),
                    absorption: Some(AbsorptionParams::default()),
                    liquidity: Some(LiquidityParams::default()),
                    delta: Some(DeltaParams::default()),
                    ..DetectorsConfig::none()
                },
                weights: weights(&[
                    (Factor::VolumeCluster, 25.0),
                    (Factor::Absorption, 30.0),
                    (Factor::LiquiditySweep, 15.0),
                    (Factor::Delta, 10.0),
                    (Factor::TrendBand, 20.0),
                ]),
                signal: SignalRules {
                    min_confluence: 2,
                    triggers: vec![Factor::Absorption, Factor::LiquiditySweep],
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_weights;
    use std::collections::HashSet;

    #[test]
    fn every_preset_validates() {
        for preset in Preset::ALL {
            preset
                .config()
                .validate()
                .unwrap_or_else(|e| panic!("{preset}: {e}"));
        }
    }

    #[test]
    fn caps_sum_to_100() {
        for preset in Preset::ALL {
            let sum: f64 = preset.config().weights.values().map(|w| w.cap).sum();
            assert_eq!(sum, 100.0, "{preset}");
        }
    }

    #[test]
    fn names_round_trip() {
        for preset in Preset::ALL {
            assert_eq!(Preset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(
            Preset::from_name("Liquidity-Hunter"),
            Some(Preset::LiquidityHunter)
        );
        assert_eq!(Preset::from_name("nope"), None);
    }

    #[test]
    fn fingerprints_are_distinct() {
        let prints: HashSet<String> = Preset::ALL
            .iter()
            .map(|p| p.config().fingerprint().unwrap())
            .collect();
        assert_eq!(prints.len(), Preset::ALL.len());
    }

    #[test]
    fn shared_factor_scaling_matches_balanced() {
        for (factor, weight) in default_weights() {
            let (_, scaled) = scaled(factor, weight.cap);
            assert_eq!(scaled, weight, "{factor}");
        }
    }

    #[test]
    fn added_factors_are_wired_into_presets() {
        let hunter = Preset::LiquidityHunter.config();
        assert!(hunter.detectors.vpoc.is_some());
        assert!(hunter.weights.contains_key(&Factor::VpocProximity));
        let sentinel = Preset::StructureSentinel.config();
        assert!(sentinel.weights.contains_key(&Factor::LiquidityVoid));
        assert_eq!(
            Preset::InstitutionalFlow.config().signal.trend_gate,
            TrendGate::BandFlip
        );
        assert!(Preset::Balanced.config().weights.contains_key(&Factor::Confluence));
    }
}
