//! Volume clusters — how much of the recent volume traded at the current price.
//!
//! Closes are bucketed into fixed-width price bins. The width is either set
//! directly or taken as a percentage of the first close the series saw, and
//! never changes afterwards, so a price always lands in the same bin. When
//! the current bin holds enough volume, its share of the window's
//! volume becomes the score magnitude, signed by where recent bars in the bin
//! closed within their ranges.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeClusterParams {
    pub lookback: usize,
    /// Absolute bin width. Overrides `bin_percent` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_width: Option<f64>,
    /// Bin width in percent of the first close.
    pub bin_percent: f64,
    /// Cluster volume must reach this multiple of the average bar volume.
    pub volume_multiple: f64,
    /// Bars before the current one inspected for the cluster's direction.
    pub recent: usize,
    pub upper_position: f64,
    pub lower_position: f64,
}

impl Default for VolumeClusterParams {
    fn default() -> Self {
        Self {
            lookback: 30,
            bin_width: None,
            bin_percent: 0.5,
            volume_multiple: 2.0,
            recent: 5,
            upper_position: 0.6,
            lower_position: 0.4,
        }
    }
}

impl VolumeClusterParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback == 0 {
            return Err(ConfigError::ZeroPeriod { name: "volume_cluster.lookback" });
        }
        if self.recent == 0 {
            return Err(ConfigError::ZeroPeriod { name: "volume_cluster.recent" });
        }
        for (name, value) in [
            ("volume_cluster.bin_percent", self.bin_percent),
            ("volume_cluster.volume_multiple", self.volume_multiple),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if let Some(width) = self.bin_width {
            if !(width > 0.0) {
                return Err(ConfigError::NonPositive {
                    name: "volume_cluster.bin_width",
                    value: width,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct VolumeCluster {
    params: VolumeClusterParams,
}

impl VolumeCluster {
    pub fn new(params: VolumeClusterParams) -> Self {
        Self { params }
    }

    fn volume_key(&self) -> StatKey {
        StatKey::mean(BarField::Volume, self.params.lookback)
    }

    fn bin_width(&self, series: &BarSeries) -> Option<f64> {
        let width = match self.params.bin_width {
            Some(width) => width,
            None => series.first()?.close * self.params.bin_percent / 100.0,
        };
        (width > 0.0 && width.is_finite()).then_some(width)
    }
}

impl Default for VolumeCluster {
    fn default() -> Self {
        Self::new(VolumeClusterParams::default())
    }
}

fn bin(price: f64, width: f64) -> i64 {
    (price / width).floor() as i64
}

impl Detector for VolumeCluster {
    fn factor(&self) -> Factor {
        Factor::VolumeCluster
    }

    fn warmup_bars(&self) -> usize {
        self.params.lookback.max(self.params.recent + 1)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        vec![self.volume_key()]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let p = &self.params;
        let neutral = DetectorOutput::neutral(Factor::VolumeCluster);
        let Some(current) = series.ago(0) else {
            return neutral;
        };
        let Some(width) = self.bin_width(series) else {
            return neutral;
        };
        let target = bin(current.close, width);

        let (cluster_volume, total_volume) = series
            .lookback(p.lookback)
            .fold((0.0, 0.0), |(cluster, total), bar| {
                let inside = bin(bar.close, width) == target;
                (cluster + if inside { bar.volume } else { 0.0 }, total + bar.volume)
            });
        let threshold = stats.value(&self.volume_key()) * p.volume_multiple;
        if total_volume <= 0.0 || cluster_volume < threshold {
            return neutral;
        }
        let concentration = ratio(cluster_volume, total_volume);

        let (mut bullish, mut bearish) = (0usize, 0usize);
        for bar in (1..=p.recent).filter_map(|k| series.ago(k)) {
            if bin(bar.close, width) != target || bar.volume <= 0.0 {
                continue;
            }
            match bar.close_position() {
                Some(pos) if pos > p.upper_position => bullish += 1,
                Some(pos) if pos < p.lower_position => bearish += 1,
                _ => {}
            }
        }

        let score = match bullish.cmp(&bearish) {
            std::cmp::Ordering::Greater => concentration * 100.0,
            std::cmp::Ordering::Less => -concentration * 100.0,
            std::cmp::Ordering::Equal => 0.0,
        };
        DetectorOutput::scored(Factor::VolumeCluster, score.clamp(-100.0, 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::test_support::flat_bars;

    fn run(bars: &[Bar]) -> f64 {
        *scores(VolumeCluster::default(), bars).last().unwrap()
    }

    /// Score on every bar once the detector is warm.
    fn scores(detector: VolumeCluster, bars: &[Bar]) -> Vec<f64> {
        let mut series = BarSeries::with_capacity(64);
        let mut stats = RollingStatistics::new(detector.required_stats());
        let mut out = Vec::new();
        for bar in bars {
            series.append(*bar).unwrap();
            stats.refresh(bar);
            if series.len() >= detector.warmup_bars() {
                out.push(detector.evaluate(&series, &stats).score);
            }
        }
        out
    }

    /// Two alternating closes, both closing near the high.
    fn two_price_series(n: usize, low_close: f64, high_close: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = if i % 2 == 0 { low_close } else { high_close };
                Bar::new(c - 0.4, c + 0.05, c - 0.5, c, 1000.0)
            })
            .collect()
    }

    /// Bars drifting upward through many bins, then a stall near 130.
    fn drift_then_stall(close_near_high: bool) -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..25)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(c - 0.5, c + 0.5, c - 1.0, c, 1000.0)
            })
            .collect();
        for _ in 0..6 {
            let bar = if close_near_high {
                Bar::new(130.0, 130.3, 129.5, 130.25, 3000.0)
            } else {
                Bar::new(130.2, 130.7, 130.0, 130.05, 3000.0)
            };
            bars.push(bar);
        }
        bars
    }

    #[test]
    fn stall_closing_high_is_bullish_cluster() {
        let score = run(&drift_then_stall(true));
        assert!(score > 0.0);
        assert!(score <= 100.0);
    }

    #[test]
    fn stall_closing_low_is_bearish_cluster() {
        assert!(run(&drift_then_stall(false)) < 0.0);
    }

    #[test]
    fn flat_data_has_no_direction() {
        assert_eq!(run(&flat_bars(40, 100.0, 1000.0)), 0.0);
    }

    #[test]
    fn bins_stay_fixed_on_stationary_prices() {
        let scores = scores(
            VolumeCluster::default(),
            &two_price_series(60, 199.4, 199.9),
        );
        assert_eq!(scores.len(), 31);
        assert!(scores[0] > 0.0);
        assert!(scores.iter().all(|&s| s == scores[0]), "{scores:?}");
    }

    #[test]
    fn absolute_bin_width_groups_nearby_closes() {
        let detector = VolumeCluster::new(VolumeClusterParams {
            bin_width: Some(1.0),
            ..Default::default()
        });
        let scores = scores(detector, &two_price_series(40, 100.2, 100.7));
        assert!(scores.iter().all(|&s| s == 100.0), "{scores:?}");
    }

    #[test]
    fn non_positive_bin_width_is_rejected() {
        let params = VolumeClusterParams {
            bin_width: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::NonPositive { name: "volume_cluster.bin_width", .. })
        ));
    }

    #[test]
    fn bins_floor_prices() {
        assert_eq!(bin(100.0, 0.5), 200);
        assert_eq!(bin(100.49, 0.5), 200);
        assert_eq!(bin(100.5, 0.5), 201);
    }
}
