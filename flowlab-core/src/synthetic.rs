//! Deterministic synthetic bars.
//!
//! The seed is mixed with a BLAKE3 hash of the symbol, so the same
//! `(symbol, seed)` pair always produces the same series and different
//! symbols diverge even with one seed.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Bar;

const START_PRICE: f64 = 100.0;
const BASE_VOLUME: f64 = 10_000.0;
/// Largest absolute close-to-close move.
const MAX_STEP: f64 = 0.015;
const SPIKE_PROBABILITY: f64 = 0.05;

/// Seed for `(symbol, seed)`, independent of call order.
pub fn symbol_seed(symbol: &str, seed: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date.succ_opt().unwrap_or(date);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next = next.succ_opt().unwrap_or(next);
    }
    next
}

/// `count` valid daily bars from a random walk with occasional volume spikes.
pub fn synthetic_bars(symbol: &str, count: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(symbol_seed(symbol, seed));
    let mut date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
    let mut close = START_PRICE;
    let mut bars = Vec::with_capacity(count);

    for i in 0..count {
        if i > 0 {
            date = next_weekday(date);
        }
        let open = close;
        close = (open * (1.0 + rng.gen_range(-MAX_STEP..MAX_STEP))).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let spike = if rng.gen_bool(SPIKE_PROBABILITY) {
            rng.gen_range(3.0..6.0)
        } else {
            1.0
        };
        let volume = (BASE_VOLUME * rng.gen_range(0.6..1.4) * spike).round();
        bars.push(Bar::new(open, high, low, close, volume).with_date(date));
    }
    bars
}
