//! Volume point of control (VPOC) proximity.
//!
//! The VPOC is the typical price of the heaviest-volume bar in the window.
//! A close resting within `proximity` of it is trading at accepted value; the
//! side of its own range the bar closed on says who is defending it.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpocParams {
    pub period: usize,
    /// Relative distance from the VPOC that counts as resting on it.
    pub proximity: f64,
    /// Score magnitude when the close rests on the VPOC.
    pub weight: f64,
}

impl Default for VpocParams {
    fn default() -> Self {
        Self {
            period: 20,
            proximity: 0.002,
            weight: 100.0,
        }
    }
}

impl VpocParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "vpoc.period" });
        }
        for (name, value) in [("vpoc.proximity", self.proximity), ("vpoc.weight", self.weight)] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct VpocProximity {
    params: VpocParams,
}

impl VpocProximity {
    pub fn new(params: VpocParams) -> Self {
        Self { params }
    }

    /// Typical price of the heaviest bar in the window; the newest bar wins
    /// ties. `None` when the window traded no volume.
    pub fn vpoc(&self, series: &BarSeries) -> Option<f64> {
        let mut best: Option<(f64, f64)> = None;
        for bar in series.lookback(self.params.period).rev() {
            if bar.volume > best.map_or(0.0, |(volume, _)| volume) {
                best = Some((bar.volume, bar.typical_price()));
            }
        }
        best.map(|(_, price)| price)
    }
}

impl Default for VpocProximity {
    fn default() -> Self {
        Self::new(VpocParams::default())
    }
}

impl Detector for VpocProximity {
    fn factor(&self) -> Factor {
        Factor::VpocProximity
    }

    fn warmup_bars(&self) -> usize {
        self.params.period
    }

    fn required_stats(&self) -> Vec<StatKey> {
        Vec::new()
    }

    fn evaluate(&self, series: &BarSeries, _stats: &RollingStatistics) -> DetectorOutput {
        let neutral = DetectorOutput::neutral(Factor::VpocProximity);
        let (Some(current), Some(vpoc)) = (series.ago(0), self.vpoc(series)) else {
            return neutral;
        };
        let distance = ratio((current.close - vpoc).abs(), current.close);
        if distance >= self.params.proximity {
            return neutral;
        }
        let score = match current.close_position() {
            Some(pos) if pos > 0.5 => self.params.weight,
            Some(pos) if pos < 0.5 => -self.params.weight,
            _ => 0.0,
        };
        DetectorOutput::scored(Factor::VpocProximity, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::test_support::flat_bars;

    fn series_of(bars: &[Bar]) -> BarSeries {
        let mut series = BarSeries::with_capacity(32);
        for bar in bars {
            series.append(*bar).unwrap();
        }
        series
    }

    fn run(bars: &[Bar]) -> f64 {
        let series = series_of(bars);
        VpocProximity::default()
            .evaluate(&series, &RollingStatistics::new(Vec::<StatKey>::new()))
            .score
    }

    /// Quiet bars around 102 with one heavy bar whose typical price is 100.
    fn profile() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..18)
            .map(|_| Bar::new(102.0, 103.0, 101.0, 102.0, 1000.0))
            .collect();
        bars.insert(9, Bar::new(99.5, 100.5, 99.5, 100.0, 5000.0));
        bars
    }

    #[test]
    fn vpoc_is_the_heaviest_bar() {
        let series = series_of(&profile());
        assert_eq!(VpocProximity::default().vpoc(&series), Some(100.0));
    }

    #[test]
    fn close_near_vpoc_high_in_range_is_bullish() {
        let mut bars = profile();
        bars.push(Bar::new(99.8, 100.15, 99.7, 100.1, 1000.0));
        assert_eq!(run(&bars), 100.0);
    }

    #[test]
    fn close_near_vpoc_low_in_range_is_bearish() {
        let mut bars = profile();
        bars.push(Bar::new(100.3, 100.4, 99.9, 99.95, 1000.0));
        assert_eq!(run(&bars), -100.0);
    }

    #[test]
    fn close_away_from_vpoc_is_neutral() {
        let mut bars = profile();
        bars.push(Bar::new(100.5, 101.2, 100.4, 101.0, 1000.0));
        assert_eq!(run(&bars), 0.0);
    }

    #[test]
    fn rangeless_or_volumeless_bars_are_neutral() {
        assert_eq!(run(&flat_bars(20, 100.0, 1000.0)), 0.0);
        assert_eq!(run(&flat_bars(20, 100.0, 0.0)), 0.0);
    }
}
