//! Append-only bar history backed by a bounded ring buffer.
//!
//! Logical indices keep growing from 0 no matter how many bars have been
//! evicted; lookups of evicted indices return `None`.

use std::collections::VecDeque;

use crate::domain::Bar;
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: VecDeque<Bar>,
    capacity: usize,
    total: usize,
    first: Option<Bar>,
}

impl BarSeries {
    /// A series retaining at most `capacity` bars (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
            first: None,
        }
    }

    /// Validate and append a bar, returning its logical index.
    ///
    /// A rejected bar leaves the series untouched.
    pub fn append(&mut self, bar: Bar) -> Result<usize, EngineError> {
        bar.validate().map_err(|reason| EngineError::InvalidBar {
            index: self.total,
            reason,
        })?;
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        self.first.get_or_insert(bar);
        let index = self.total;
        self.total += 1;
        Ok(index)
    }

    /// Total number of bars ever appended.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of bars currently held in memory.
    pub fn retained(&self) -> usize {
        self.bars.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bar at a logical index, if it is still retained.
    pub fn bar(&self, index: usize) -> Option<&Bar> {
        let first = self.total - self.bars.len();
        if index < first {
            return None;
        }
        self.bars.get(index - first)
    }

    /// The bar `n` bars back from the most recent one (`ago(0)` is the latest).
    pub fn ago(&self, n: usize) -> Option<&Bar> {
        let len = self.bars.len();
        if n >= len {
            return None;
        }
        self.bars.get(len - 1 - n)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// The first bar ever appended. Survives eviction.
    pub fn first(&self) -> Option<&Bar> {
        self.first.as_ref()
    }

    /// The `n` most recent bars (fewer if history is shorter), oldest first.
    pub fn lookback(&self, n: usize) -> impl DoubleEndedIterator<Item = &Bar> + ExactSizeIterator + '_ {
        let skip = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(skip)
    }

    /// True when `n` bars back (inclusive) are all retained.
    pub fn has(&self, n: usize) -> bool {
        n < self.bars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarError;
    use crate::test_support::make_bars;

    #[test]
    fn append_assigns_monotonic_indices() {
        let mut series = BarSeries::with_capacity(10);
        for (i, bar) in make_bars(&[10.0, 11.0, 12.0]).into_iter().enumerate() {
            assert_eq!(series.append(bar).unwrap(), i);
        }
        assert_eq!(series.len(), 3);
        assert_eq!(series.last().unwrap().close, 12.0);
        assert_eq!(series.ago(2).unwrap().close, 10.0);
        assert!(series.ago(3).is_none());
    }

    #[test]
    fn ring_buffer_evicts_oldest_but_keeps_indices() {
        let mut series = BarSeries::with_capacity(3);
        for bar in make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]) {
            series.append(bar).unwrap();
        }
        assert_eq!(series.len(), 5);
        assert_eq!(series.retained(), 3);
        assert!(series.bar(1).is_none());
        assert_eq!(series.bar(2).unwrap().close, 3.0);
        assert_eq!(series.bar(4).unwrap().close, 5.0);
        assert!(series.bar(5).is_none());
        assert_eq!(series.first().unwrap().close, 1.0);
    }

    #[test]
    fn lookback_is_chronological_and_restartable() {
        let mut series = BarSeries::with_capacity(10);
        for bar in make_bars(&[1.0, 2.0, 3.0, 4.0]) {
            series.append(bar).unwrap();
        }
        let closes: Vec<f64> = series.lookback(2).map(|b| b.close).collect();
        assert_eq!(closes, vec![3.0, 4.0]);
        let again: Vec<f64> = series.lookback(2).map(|b| b.close).collect();
        assert_eq!(closes, again);
        // Asking for more than exists yields everything.
        assert_eq!(series.lookback(100).len(), 4);
    }

    #[test]
    fn rejected_bar_does_not_mutate() {
        let mut series = BarSeries::with_capacity(10);
        series.append(Bar::new(10.0, 11.0, 9.0, 10.5, 100.0)).unwrap();
        let err = series
            .append(Bar::new(10.0, 9.0, 11.0, 10.0, 100.0))
            .unwrap_err();
        match err {
            EngineError::InvalidBar { index, reason } => {
                assert_eq!(index, 1);
                assert!(matches!(reason, BarError::HighBelowLow { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(series.len(), 1);
        assert_eq!(series.last().unwrap().close, 10.5);
        assert_eq!(series.first().unwrap().close, 10.5);
    }
}
