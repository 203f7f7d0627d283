//! Bar builders and float helpers shared by unit tests.

use crate::domain::Bar;

/// Create synthetic bars from close prices.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(open, open.max(close) + 1.0, open.min(close) - 1.0, close, 1000.0)
        })
        .collect()
}

/// Bars with constant OHLC = `price` and constant volume.
pub fn flat_bars(n: usize, price: f64, volume: f64) -> Vec<Bar> {
    (0..n)
        .map(|_| Bar::new(price, price, price, price, volume))
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
pub const DEFAULT_EPSILON: f64 = 1e-10;
