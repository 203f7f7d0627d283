//! Engine configuration — detector parameters, weights and signal rules.
//!
//! Everything is serde-serializable so a configuration can be loaded from TOML
//! and fingerprinted. Maps are `BTreeMap` so serialization order, and with it
//! the fingerprint, is deterministic.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::band::TrendBandParams;
use crate::detectors::{
    AbsorptionParams, DeltaParams, DivergenceParams, FairValueGapParams, LiquidityParams,
    LiquidityVoidParams, OrderBlockParams, StructureParams, VolumeClusterParams, VpocParams,
    VwapParams,
};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::scoring::FactorWeight;
use crate::signal::SignalRules;

/// Tolerance on the weight caps summing to 100.
const CAP_TOLERANCE: f64 = 1e-9;

// ─── Detector set ───────────────────────────────────────────────────

/// Enabled detectors. A detector runs when its block is present.
///
/// Missing blocks deserialize as disabled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absorption: Option<AbsorptionParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<LiquidityParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_block: Option<OrderBlockParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fair_value_gap: Option<FairValueGapParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<DivergenceParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_cluster: Option<VolumeClusterParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vwap: Option<VwapParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_void: Option<LiquidityVoidParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpoc: Option<VpocParams>,
}

impl DetectorsConfig {
    /// Every detector with default parameters.
    pub fn all() -> Self {
        Self {
            absorption: Some(AbsorptionParams::default()),
            liquidity: Some(LiquidityParams::default()),
            order_block: Some(OrderBlockParams::default()),
            fair_value_gap: Some(FairValueGapParams::default()),
            structure: Some(StructureParams::default()),
            divergence: Some(DivergenceParams::default()),
            volume_cluster: Some(VolumeClusterParams::default()),
            delta: Some(DeltaParams::default()),
            vwap: Some(VwapParams::default()),
            liquidity_void: Some(LiquidityVoidParams::default()),
            vpoc: Some(VpocParams::default()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Factors fed by the enabled detectors.
    pub fn enabled_factors(&self) -> Vec<Factor> {
        [
            (self.absorption.is_some(), Factor::Absorption),
            (self.liquidity.is_some(), Factor::LiquiditySweep),
            (self.order_block.is_some(), Factor::OrderBlock),
            (self.fair_value_gap.is_some(), Factor::FairValueGap),
            (self.structure.is_some(), Factor::StructureBreak),
            (self.divergence.is_some(), Factor::Divergence),
            (self.volume_cluster.is_some(), Factor::VolumeCluster),
            (self.delta.is_some(), Factor::Delta),
            (self.vwap.is_some(), Factor::VwapDeviation),
            (self.liquidity_void.is_some(), Factor::LiquidityVoid),
            (self.vpoc.is_some(), Factor::VpocProximity),
        ]
        .into_iter()
        .filter_map(|(enabled, factor)| enabled.then_some(factor))
        .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(p) = &self.absorption {
            p.validate()?;
        }
        if let Some(p) = &self.liquidity {
            p.validate()?;
        }
        if let Some(p) = &self.order_block {
            p.validate()?;
        }
        if let Some(p) = &self.fair_value_gap {
            p.validate()?;
        }
        if let Some(p) = &self.structure {
            p.validate()?;
        }
        if let Some(p) = &self.divergence {
            p.validate()?;
        }
        if let Some(p) = &self.volume_cluster {
            p.validate()?;
        }
        if let Some(p) = &self.delta {
            p.validate()?;
        }
        if let Some(p) = &self.vwap {
            p.validate()?;
        }
        if let Some(p) = &self.liquidity_void {
            p.validate()?;
        }
        if let Some(p) = &self.vpoc {
            p.validate()?;
        }
        Ok(())
    }
}

// ─── EMA stack ──────────────────────────────────────────────────────

/// Fast/medium/slow EMA periods on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaParams {
    /// Disabled stacks register no EMAs and feed no alignment factor.
    pub enabled: bool,
    pub fast: usize,
    pub medium: usize,
    pub slow: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 9,
            medium: 21,
            slow: 50,
        }
    }
}

impl EmaParams {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Longest of the three periods.
    pub fn longest(&self) -> usize {
        self.fast.max(self.medium).max(self.slow)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, period) in [
            ("ema.fast", self.fast),
            ("ema.medium", self.medium),
            ("ema.slow", self.slow),
        ] {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod { name });
            }
        }
        Ok(())
    }
}

// ─── EngineConfig ───────────────────────────────────────────────────

/// Complete engine configuration, constant for the life of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bars retained beyond the longest detector warm-up.
    pub history_margin: usize,
    pub ema: EmaParams,
    pub band: TrendBandParams,
    pub signal: SignalRules,
    pub detectors: DetectorsConfig,
    pub weights: BTreeMap<Factor, FactorWeight>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_margin: 8,
            ema: EmaParams::default(),
            band: TrendBandParams::default(),
            signal: SignalRules::default(),
            detectors: DetectorsConfig {
                vwap: None,
                liquidity_void: None,
                vpoc: None,
                ..DetectorsConfig::all()
            },
            weights: default_weights(),
        }
    }
}

/// Balanced weights over the default detector set.
pub fn default_weights() -> BTreeMap<Factor, FactorWeight> {
    BTreeMap::from([
        (Factor::EmaAlignment, FactorWeight::new(10.0, 1.0, 0.0)),
        (Factor::Delta, FactorWeight::new(10.0, 5000.0, 200.0)),
        (Factor::Absorption, FactorWeight::new(20.0, 6.0, 10.0)),
        (Factor::LiquiditySweep, FactorWeight::new(10.0, 8.0, 0.0)),
        (Factor::OrderBlock, FactorWeight::new(10.0, 6.0, 0.0)),
        (Factor::FairValueGap, FactorWeight::new(5.0, 1.0, 0.0)),
        (Factor::StructureBreak, FactorWeight::new(10.0, 4.0, 0.0)),
        (Factor::Divergence, FactorWeight::new(5.0, 5.0, 0.0)),
        (Factor::VolumeCluster, FactorWeight::new(5.0, 10.0, 20.0)),
        (Factor::TrendBand, FactorWeight::new(10.0, 1.0, 0.0)),
        (Factor::Confluence, FactorWeight::new(5.0, 0.5, 0.0)),
    ])
}

impl EngineConfig {
    /// Parse and validate a TOML configuration. Missing fields take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Factors that produce a raw score under this configuration.
    pub fn enabled_factors(&self) -> Vec<Factor> {
        let mut factors = self.detectors.enabled_factors();
        if self.ema.enabled {
            factors.push(Factor::EmaAlignment);
        }
        factors.push(Factor::TrendBand);
        factors.push(Factor::Confluence);
        factors
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detectors.validate()?;
        self.ema.validate()?;
        self.band.validate()?;
        self.signal.validate()?;

        let enabled = self.enabled_factors();
        for (factor, weight) in &self.weights {
            if !enabled.contains(factor) {
                return Err(ConfigError::DisabledFactor(*factor));
            }
            if !(weight.normalization > 0.0) {
                return Err(ConfigError::NonPositive {
                    name: "weights.normalization",
                    value: weight.normalization,
                });
            }
            if !(weight.cap >= 0.0) {
                return Err(ConfigError::NonPositive {
                    name: "weights.cap",
                    value: weight.cap,
                });
            }
        }
        let sum: f64 = self.weights.values().map(|w| w.cap).sum();
        if (sum - 100.0).abs() > CAP_TOLERANCE {
            return Err(ConfigError::CapSum { sum });
        }
        if let Some(trigger) = self
            .signal
            .triggers
            .iter()
            .find(|t| !enabled.contains(t))
        {
            return Err(ConfigError::UnknownTrigger(*trigger));
        }
        Ok(())
    }

    /// BLAKE3 hex digest of the canonical JSON form. Identical configurations
    /// always share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn default_caps_sum_to_100() {
        let sum: f64 = default_weights().values().map(|w| w.cap).sum();
        assert_eq!(sum, 100.0);
    }

    #[test]
    fn weight_on_disabled_factor_is_rejected() {
        let mut config = EngineConfig::default();
        config.detectors.absorption = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DisabledFactor(Factor::Absorption))
        ));
    }

    #[test]
    fn cap_sum_is_enforced() {
        let mut config = EngineConfig::default();
        if let Some(w) = config.weights.get_mut(&Factor::Delta) {
            w.cap += 1.0;
        }
        assert!(matches!(config.validate(), Err(ConfigError::CapSum { .. })));
    }

    #[test]
    fn trigger_must_be_enabled() {
        let mut config = EngineConfig::default();
        config.signal.triggers.push(Factor::VwapDeviation);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownTrigger(Factor::VwapDeviation))
        ));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [band]
            period = 14
            multiplier = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.band.period, 14);
        assert_eq!(config.band.multiplier, 2.0);
        assert!(config.band.adaptive);
        assert_eq!(config.weights, default_weights());
        assert!(config.detectors.absorption.is_some());
    }

    #[test]
    fn zero_period_is_rejected_from_toml() {
        let err = EngineConfig::from_toml_str(
            r#"
            [band]
            period = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPeriod { name: "band.period" }));
    }

    #[test]
    fn fingerprint_tracks_parameters() {
        let a = EngineConfig::default();
        let mut b = EngineConfig::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.band.multiplier = 3.0;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }
}
