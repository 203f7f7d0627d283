//! Deviation of the close from the rolling volume-weighted typical price.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapParams {
    pub period: usize,
}

impl Default for VwapParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl VwapParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "vwap.period" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct VwapDeviation {
    params: VwapParams,
}

impl VwapDeviation {
    pub fn new(params: VwapParams) -> Self {
        Self { params }
    }

    /// Volume-weighted typical price over the period, `None` without volume.
    pub fn vwap(&self, series: &BarSeries) -> Option<f64> {
        let (pv, volume) = series
            .lookback(self.params.period)
            .fold((0.0, 0.0), |(pv, v), bar| {
                (pv + bar.typical_price() * bar.volume, v + bar.volume)
            });
        (volume > 0.0).then(|| pv / volume)
    }
}

impl Default for VwapDeviation {
    fn default() -> Self {
        Self::new(VwapParams::default())
    }
}

impl Detector for VwapDeviation {
    fn factor(&self) -> Factor {
        Factor::VwapDeviation
    }

    fn warmup_bars(&self) -> usize {
        self.params.period
    }

    fn required_stats(&self) -> Vec<StatKey> {
        Vec::new()
    }

    fn evaluate(&self, series: &BarSeries, _stats: &RollingStatistics) -> DetectorOutput {
        let (Some(bar), Some(vwap)) = (series.ago(0), self.vwap(series)) else {
            return DetectorOutput::neutral(Factor::VwapDeviation);
        };
        DetectorOutput::scored(Factor::VwapDeviation, ratio(bar.close - vwap, vwap) * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::test_support::{assert_approx, flat_bars};

    fn series_of(bars: &[Bar]) -> BarSeries {
        let mut series = BarSeries::with_capacity(32);
        for bar in bars {
            series.append(*bar).unwrap();
        }
        series
    }

    #[test]
    fn close_above_vwap_is_positive() {
        let mut bars = flat_bars(19, 100.0, 1000.0);
        bars.push(Bar::new(100.0, 110.0, 100.0, 110.0, 1000.0));
        let detector = VwapDeviation::default();
        let series = series_of(&bars);
        let stats = RollingStatistics::new(Vec::<StatKey>::new());
        // Typical price of the last bar is 320/3; VWAP is the volume-weighted mean.
        let vwap = (19.0 * 100.0 + 320.0 / 3.0) / 20.0;
        assert_approx(detector.vwap(&series).unwrap(), vwap, 1e-9);
        let out = detector.evaluate(&series, &stats);
        assert_approx(out.score, (110.0 - vwap) / vwap * 100.0, 1e-9);
    }

    #[test]
    fn zero_volume_window_is_neutral() {
        let series = series_of(&flat_bars(20, 100.0, 0.0));
        let out = VwapDeviation::default().evaluate(&series, &RollingStatistics::new(Vec::<StatKey>::new()));
        assert_eq!(out.score, 0.0);
    }
}
