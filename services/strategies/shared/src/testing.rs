//! Testing utilities for strategies
//!
//! Deterministic candle fixtures shared by unit and integration tests.

use types::Candle;

/// Open time of the first fixture candle (2024-01-01T00:00:00Z)
pub const BASE_TIME_MS: i64 = 1_704_067_200_000;

/// Spacing between fixture candles (one minute)
pub const STEP_MS: i64 = 60_000;

/// Build candles from `(open, high, low, close)` rows, one minute apart
pub fn candles_from_ohlc(rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    candles_from_ohlc_at(BASE_TIME_MS, STEP_MS, rows)
}

/// Build candles from `(open, high, low, close)` rows with explicit timing
pub fn candles_from_ohlc_at(start: i64, step: i64, rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Candle::new(start + i as i64 * step, open, high, low, close, 100.0)
        })
        .collect()
}

/// Oscillating series with regular swing highs and lows
///
/// Closes follow a triangle wave of the given half-period around `base`, so a
/// swing window narrower than the half-period marks every turn.
pub fn zigzag_series(len: usize, base: f64, amplitude: f64, half_period: usize) -> Vec<Candle> {
    let half_period = half_period.max(1);
    let step = amplitude / half_period as f64;
    let mut candles = Vec::with_capacity(len);
    let mut price = base;

    for i in 0..len {
        let rising = (i / half_period) % 2 == 0;
        let open = price;
        let close = if rising { price + step } else { price - step };
        // Asymmetric wicks keep turning points strict extrema
        let wick = if rising { step * 0.25 } else { step * 0.1 };
        let high = open.max(close) + wick;
        let low = open.min(close) - wick;
        candles.push(Candle::new(
            BASE_TIME_MS + i as i64 * STEP_MS,
            open,
            high,
            low,
            close,
            100.0 + i as f64,
        ));
        price = close;
    }

    candles
}

/// Append one closed candle continuing the series from its last close
pub fn push_next_candle(candles: &mut Vec<Candle>, close: f64) {
    let (time, open) = match candles.last() {
        Some(last) => (last.time + STEP_MS, last.close),
        None => (BASE_TIME_MS, close),
    };
    candles.push(Candle::new(
        time,
        open,
        open.max(close) + 0.5,
        open.min(close) - 0.5,
        close,
        100.0,
    ));
}

/// Ten-candle series with a swing low at index 5 (104) swept by candle 8
pub fn liquidity_sweep_series() -> Vec<Candle> {
    candles_from_ohlc(&[
        (100.0, 105.0, 95.0, 100.0),
        (100.0, 104.0, 96.0, 102.0),
        (102.0, 106.0, 98.0, 104.0),
        (104.0, 108.0, 100.0, 106.0),
        (106.0, 110.0, 102.0, 108.0),
        (108.0, 112.0, 104.0, 105.0),
        (105.0, 109.0, 101.0, 107.0),
        (107.0, 111.0, 103.0, 109.0),
        (109.0, 113.0, 102.0, 108.0),
        (108.0, 112.0, 104.0, 110.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::validate_sequence;

    #[test]
    fn test_fixtures_are_valid_sequences() {
        assert!(validate_sequence(&liquidity_sweep_series()).is_ok());
        assert!(validate_sequence(&zigzag_series(200, 100.0, 5.0, 6)).is_ok());

        let mut candles = candles_from_ohlc(&[(1.0, 2.0, 0.5, 1.5)]);
        push_next_candle(&mut candles, 2.0);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].open, 1.5);
        assert!(validate_sequence(&candles).is_ok());
    }
}
