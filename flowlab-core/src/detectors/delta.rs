//! Current-bar delta, amplified when volume is aggressive.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaParams {
    pub volume_period: usize,
    /// Volume ratio above which delta is scaled by `first_boost`.
    pub first_threshold: f64,
    pub first_boost: f64,
    /// Volume ratio above which delta is scaled by `second_boost` instead.
    pub second_threshold: f64,
    pub second_boost: f64,
}

impl Default for DeltaParams {
    fn default() -> Self {
        Self {
            volume_period: 20,
            first_threshold: 1.5,
            first_boost: 1.25,
            second_threshold: 2.0,
            second_boost: 1.5,
        }
    }
}

impl DeltaParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.volume_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "delta.volume_period" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeltaPressure {
    params: DeltaParams,
}

impl DeltaPressure {
    pub fn new(params: DeltaParams) -> Self {
        Self { params }
    }
}

impl Default for DeltaPressure {
    fn default() -> Self {
        Self::new(DeltaParams::default())
    }
}

impl Detector for DeltaPressure {
    fn factor(&self) -> Factor {
        Factor::Delta
    }

    fn warmup_bars(&self) -> usize {
        self.params.volume_period
    }

    fn required_stats(&self) -> Vec<StatKey> {
        vec![StatKey::mean(BarField::Volume, self.params.volume_period)]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let p = &self.params;
        let Some(bar) = series.ago(0) else {
            return DetectorOutput::neutral(Factor::Delta);
        };
        let vol_ratio = stats.volume_ratio(bar.volume, p.volume_period);
        let boost = if vol_ratio > p.second_threshold {
            p.second_boost
        } else if vol_ratio > p.first_threshold {
            p.first_boost
        } else {
            1.0
        };
        DetectorOutput::scored(Factor::Delta, bar.delta() * boost)
    }
}
