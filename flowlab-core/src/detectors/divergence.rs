//! Price versus cumulative delta divergence.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceParams {
    pub period: usize,
    /// Minimum relative price change over the period.
    pub min_price_change: f64,
    /// Minimum cumulative delta as a fraction of the period's volume.
    pub min_delta: f64,
    pub score: f64,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            period: 20,
            min_price_change: 0.005,
            min_delta: 0.1,
            score: 25.0,
        }
    }
}

impl DivergenceParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "divergence.period" });
        }
        for (name, value) in [
            ("divergence.min_price_change", self.min_price_change),
            ("divergence.min_delta", self.min_delta),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeltaDivergence {
    params: DivergenceParams,
}

impl DeltaDivergence {
    pub fn new(params: DivergenceParams) -> Self {
        Self { params }
    }
}

impl Default for DeltaDivergence {
    fn default() -> Self {
        Self::new(DivergenceParams::default())
    }
}

impl Detector for DeltaDivergence {
    fn factor(&self) -> Factor {
        Factor::Divergence
    }

    fn warmup_bars(&self) -> usize {
        2 * self.params.period
    }

    fn required_stats(&self) -> Vec<StatKey> {
        Vec::new()
    }

    fn evaluate(&self, series: &BarSeries, _stats: &RollingStatistics) -> DetectorOutput {
        let p = &self.params;
        let (Some(current), Some(anchor)) = (series.ago(0), series.ago(p.period)) else {
            return DetectorOutput::neutral(Factor::Divergence);
        };

        let (cum_delta, volume) = (0..p.period)
            .filter_map(|k| series.ago(k))
            .fold((0.0, 0.0), |(d, v), bar| (d + bar.delta(), v + bar.volume));
        let price_change = ratio(current.close - anchor.close, anchor.close);
        let delta_norm = ratio(cum_delta, volume);

        let score = if price_change < -p.min_price_change && delta_norm > p.min_delta {
            p.score
        } else if price_change > p.min_price_change && delta_norm < -p.min_delta {
            -p.score
        } else {
            0.0
        };
        DetectorOutput::scored(Factor::Divergence, score)
    }
}
