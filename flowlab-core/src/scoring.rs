//! Composite scorer — folds raw factor scores into one bounded conviction score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Factor;

/// Upper bound of the composite score magnitude.
pub const SCORE_LIMIT: f64 = 100.0;

/// How one factor contributes to the composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeight {
    /// Maximum points this factor may contribute in either direction.
    pub cap: f64,
    /// Raw score is divided by this before capping.
    pub normalization: f64,
    /// |raw| above this counts toward confluence.
    #[serde(default)]
    pub confluence_floor: f64,
}

impl FactorWeight {
    pub const fn new(cap: f64, normalization: f64, confluence_floor: f64) -> Self {
        Self {
            cap,
            normalization,
            confluence_floor,
        }
    }

    /// `clamp(raw / normalization, -cap, cap)`, 0 for a degenerate input.
    pub fn contribution(&self, raw: f64) -> f64 {
        if self.normalization <= 0.0 {
            return 0.0;
        }
        let scaled = raw / self.normalization;
        if scaled.is_finite() {
            scaled.clamp(-self.cap, self.cap)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeScore {
    /// Sum of contributions, within `[-100, 100]`.
    pub value: f64,
    pub breakdown: BTreeMap<Factor, f64>,
}

impl CompositeScore {
    pub fn contribution(&self, factor: Factor) -> f64 {
        self.breakdown.get(&factor).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: BTreeMap<Factor, FactorWeight>,
}

impl CompositeScorer {
    pub fn new(weights: BTreeMap<Factor, FactorWeight>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &BTreeMap<Factor, FactorWeight> {
        &self.weights
    }

    /// Combine raw factor scores. Weighted factors absent from `raw` count as 0;
    /// factors without a weight are ignored.
    pub fn combine(&self, raw: &BTreeMap<Factor, f64>) -> CompositeScore {
        let breakdown: BTreeMap<Factor, f64> = self
            .weights
            .iter()
            .map(|(&factor, weight)| {
                let score = raw.get(&factor).copied().unwrap_or(0.0);
                (factor, weight.contribution(score))
            })
            .collect();
        let value = breakdown
            .values()
            .sum::<f64>()
            .clamp(-SCORE_LIMIT, SCORE_LIMIT);
        CompositeScore { value, breakdown }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> CompositeScorer {
        CompositeScorer::new(BTreeMap::from([
            (Factor::Absorption, FactorWeight::new(60.0, 6.0, 0.0)),
            (Factor::TrendBand, FactorWeight::new(40.0, 1.0, 0.0)),
        ]))
    }

    #[test]
    fn contribution_is_scaled_then_capped() {
        let w = FactorWeight::new(20.0, 6.0, 0.0);
        assert_eq!(w.contribution(60.0), 10.0);
        assert_eq!(w.contribution(600.0), 20.0);
        assert_eq!(w.contribution(-600.0), -20.0);
        assert_eq!(w.contribution(f64::NAN), 0.0);
        assert_eq!(FactorWeight::new(20.0, 0.0, 0.0).contribution(5.0), 0.0);
    }

    #[test]
    fn combine_sums_and_reports_breakdown() {
        let raw = BTreeMap::from([(Factor::Absorption, -120.0), (Factor::TrendBand, 100.0)]);
        let score = scorer().combine(&raw);
        assert_eq!(score.contribution(Factor::Absorption), -20.0);
        assert_eq!(score.contribution(Factor::TrendBand), 40.0);
        assert_eq!(score.value, 20.0);
    }

    #[test]
    fn missing_and_unweighted_factors() {
        let raw = BTreeMap::from([(Factor::Delta, 1e9)]);
        let score = scorer().combine(&raw);
        assert_eq!(score.value, 0.0);
        assert_eq!(score.breakdown.len(), 2);
        assert!(!score.breakdown.contains_key(&Factor::Delta));
    }

    #[test]
    fn total_is_clamped() {
        let heavy = CompositeScorer::new(BTreeMap::from([
            (Factor::Absorption, FactorWeight::new(80.0, 1.0, 0.0)),
            (Factor::Delta, FactorWeight::new(80.0, 1.0, 0.0)),
        ]));
        let raw = BTreeMap::from([(Factor::Absorption, 500.0), (Factor::Delta, 500.0)]);
        assert_eq!(heavy.combine(&raw).value, 100.0);
    }
}
