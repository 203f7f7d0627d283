/// Warm-up tracker: counts accepted bars against the longest lookback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupState {
    warmup_bars: usize,
    bars_processed: usize,
}

impl WarmupState {
    pub fn new(warmup_bars: usize) -> Self {
        Self {
            warmup_bars,
            bars_processed: 0,
        }
    }

    /// Warm-up is the longest of the given lookbacks (0 when empty).
    pub fn from_lookbacks(lookbacks: impl IntoIterator<Item = usize>) -> Self {
        Self::new(lookbacks.into_iter().max().unwrap_or(0))
    }

    /// Count one accepted bar. Returns true on the bar that completes warm-up.
    pub fn process_bar(&mut self) -> bool {
        let was_warm = self.is_warm();
        self.bars_processed += 1;
        !was_warm && self.is_warm()
    }

    pub fn is_warm(&self) -> bool {
        self.bars_processed >= self.warmup_bars
    }

    pub fn bars_until_warm(&self) -> usize {
        self.warmup_bars.saturating_sub(self.bars_processed)
    }

    pub fn warmup_bars(&self) -> usize {
        self.warmup_bars
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }
}
