//! Rolling maximum / minimum over the last `period` values.
//!
//! Monotonic deque: each value is pushed and popped at most once, so updates
//! are O(1) amortised.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::StreamingIndicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    Max,
    Min,
}

#[derive(Debug, Clone)]
pub struct RollingExtremum {
    period: usize,
    extreme: Extreme,
    /// (sequence number, value), values monotonic from front to back.
    deque: VecDeque<(usize, f64)>,
    seq: usize,
    name: String,
}

impl RollingExtremum {
    pub fn new(period: usize, extreme: Extreme) -> Self {
        assert!(period >= 1, "extremum period must be >= 1");
        let prefix = match extreme {
            Extreme::Max => "max",
            Extreme::Min => "min",
        };
        Self {
            period,
            extreme,
            deque: VecDeque::new(),
            seq: 0,
            name: format!("{prefix}_{period}"),
        }
    }

    pub fn max(period: usize) -> Self {
        Self::new(period, Extreme::Max)
    }

    pub fn min(period: usize) -> Self {
        Self::new(period, Extreme::Min)
    }

    /// True if `candidate` should evict `existing` from the back of the deque.
    fn dominates(&self, candidate: f64, existing: f64) -> bool {
        match self.extreme {
            Extreme::Max => candidate >= existing,
            Extreme::Min => candidate <= existing,
        }
    }
}

impl StreamingIndicator for RollingExtremum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, value: f64) -> f64 {
        while let Some(&(_, back)) = self.deque.back() {
            if self.dominates(value, back) {
                self.deque.pop_back();
            } else {
                break;
            }
        }
        self.deque.push_back((self.seq, value));
        // Drop entries that fell out of the window.
        while let Some(&(seq, _)) = self.deque.front() {
            if seq + self.period <= self.seq {
                self.deque.pop_front();
            } else {
                break;
            }
        }
        self.seq += 1;
        self.value()
    }

    fn value(&self) -> f64 {
        self.deque.front().map(|&(_, v)| v).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_max_tracks_window() {
        let mut max = RollingExtremum::max(3);
        let out: Vec<f64> = [1.0, 3.0, 2.0, 1.0, 0.5, 4.0]
            .iter()
            .map(|&v| max.update(v))
            .collect();
        assert_eq!(out, vec![1.0, 3.0, 3.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn rolling_min_tracks_window() {
        let mut min = RollingExtremum::min(2);
        let out: Vec<f64> = [5.0, 3.0, 4.0, 6.0, 1.0]
            .iter()
            .map(|&v| min.update(v))
            .collect();
        assert_eq!(out, vec![5.0, 3.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn empty_extremum_is_zero() {
        assert_eq!(RollingExtremum::max(5).value(), 0.0);
    }

    #[test]
    fn matches_naive_scan() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 23) as f64).collect();
        let mut max = RollingExtremum::max(7);
        for (i, &v) in values.iter().enumerate() {
            let got = max.update(v);
            let start = (i + 1).saturating_sub(7);
            let expected = values[start..=i].iter().cloned().fold(f64::MIN, f64::max);
            assert_eq!(got, expected, "mismatch at {i}");
        }
    }
}
