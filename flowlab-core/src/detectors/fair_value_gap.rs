//! Fair value gaps — price skipped between bar `i` and bar `i-2`.

use serde::{Deserialize, Serialize};

use super::{Detector, DetectorOutput};
use crate::domain::Factor;
use crate::error::ConfigError;
use crate::indicators::BarField;
use crate::series::BarSeries;
use crate::stats::{ratio, RollingStatistics, StatKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FairValueGapParams {
    /// Period of the average range the gap is compared against.
    pub range_period: usize,
    /// Minimum gap size as a fraction of the average range.
    pub min_size: f64,
    /// Gaps formed up to this many bars ago still count while unfilled.
    pub max_age: usize,
}

impl Default for FairValueGapParams {
    fn default() -> Self {
        Self {
            range_period: 10,
            min_size: 0.5,
            max_age: 2,
        }
    }
}

impl FairValueGapParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.range_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "fair_value_gap.range_period" });
        }
        if !(self.min_size > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "fair_value_gap.min_size",
                value: self.min_size,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FairValueGap {
    params: FairValueGapParams,
}

impl FairValueGap {
    pub fn new(params: FairValueGapParams) -> Self {
        Self { params }
    }

    fn range_key(&self) -> StatKey {
        StatKey::mean(BarField::Range, self.params.range_period)
    }

    /// Signed gap size formed at `age` bars back, if it is large enough and
    /// no newer bar has traded through it.
    fn gap_at(&self, series: &BarSeries, age: usize, min_size: f64) -> Option<f64> {
        let (Some(right), Some(left)) = (series.ago(age), series.ago(age + 2)) else {
            return None;
        };
        let mut newer = (0..age).filter_map(|k| series.ago(k));

        if right.low > left.high {
            let size = right.low - left.high;
            let filled = newer.any(|b| b.low <= left.high);
            return (size > min_size && !filled).then_some(size);
        }
        if right.high < left.low {
            let size = left.low - right.high;
            let filled = newer.any(|b| b.high >= left.low);
            return (size > min_size && !filled).then_some(-size);
        }
        None
    }
}

impl Default for FairValueGap {
    fn default() -> Self {
        Self::new(FairValueGapParams::default())
    }
}

impl Detector for FairValueGap {
    fn factor(&self) -> Factor {
        Factor::FairValueGap
    }

    fn warmup_bars(&self) -> usize {
        self.params.range_period.max(self.params.max_age + 3)
    }

    fn required_stats(&self) -> Vec<StatKey> {
        vec![self.range_key()]
    }

    fn evaluate(&self, series: &BarSeries, stats: &RollingStatistics) -> DetectorOutput {
        let Some(current) = series.ago(0) else {
            return DetectorOutput::neutral(Factor::FairValueGap);
        };
        let min_size = stats.value(&self.range_key()) * self.params.min_size;

        let score = (0..=self.params.max_age)
            .find_map(|age| self.gap_at(series, age, min_size))
            .map(|size| ratio(size, current.close) * 100.0)
            .unwrap_or(0.0);

        DetectorOutput::scored(Factor::FairValueGap, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::test_support::{assert_approx, flat_bars};

    fn run(bars: &[Bar]) -> f64 {
        let detector = FairValueGap::default();
        let mut series = BarSeries::with_capacity(32);
        let mut stats = RollingStatistics::new(detector.required_stats());
        for bar in bars {
            series.append(*bar).unwrap();
            stats.refresh(bar);
        }
        detector.evaluate(&series, &stats).score
    }

    fn base() -> Vec<Bar> {
        (0..10)
            .map(|_| Bar::new(100.0, 101.0, 99.0, 100.0, 1000.0))
            .collect()
    }

    #[test]
    fn bullish_gap_reports_size_over_close() {
        let mut bars = base();
        bars.push(Bar::new(100.0, 103.0, 100.0, 103.0, 1000.0));
        // low 104 > high two bars back (101): gap of 3.
        bars.push(Bar::new(104.0, 106.0, 104.0, 105.0, 1000.0));
        assert_approx(run(&bars), 3.0 / 105.0 * 100.0, 1e-9);
    }

    #[test]
    fn bearish_gap_is_negative() {
        let mut bars = base();
        bars.push(Bar::new(100.0, 100.0, 97.0, 97.0, 1000.0));
        bars.push(Bar::new(96.0, 96.0, 94.0, 95.0, 1000.0));
        assert!(run(&bars) < 0.0);
    }

    #[test]
    fn small_gap_is_exactly_zero() {
        let mut bars = base();
        bars.push(Bar::new(100.0, 101.05, 100.0, 101.0, 1000.0));
        // Gap of 0.1 against an average range near 2.
        bars.push(Bar::new(101.1, 101.6, 101.1, 101.5, 1000.0));
        assert_eq!(run(&bars), 0.0);
    }

    #[test]
    fn filled_gap_no_longer_counts() {
        let mut bars = base();
        bars.push(Bar::new(100.0, 103.0, 100.0, 103.0, 1000.0));
        bars.push(Bar::new(104.0, 106.0, 104.0, 105.0, 1000.0));
        // Trades back down through the gap's lower edge.
        bars.push(Bar::new(105.0, 105.0, 100.8, 101.0, 1000.0));
        assert_eq!(run(&bars), 0.0);
    }

    #[test]
    fn flat_bars_have_no_gap() {
        assert_eq!(run(&flat_bars(12, 100.0, 1000.0)), 0.0);
    }
}
