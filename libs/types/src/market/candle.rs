//! OHLCV candle record and sequence validation

use crate::common::errors::{CandleError, PriceField};
#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// One OHLCV bar
///
/// `time` is the bar open time in epoch milliseconds. Within a sequence times
/// are strictly increasing and unique per (instrument, resolution).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Net-up candle (close strictly above open)
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Net-down candle (close strictly below open)
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute body size
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-low range
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    fn fields(&self) -> [(PriceField, f64); 5] {
        [
            (PriceField::Open, self.open),
            (PriceField::High, self.high),
            (PriceField::Low, self.low),
            (PriceField::Close, self.close),
            (PriceField::Volume, self.volume),
        ]
    }
}

/// Validate a candle window before any detector runs
///
/// Rejects non-monotonic timestamps, non-finite values and negative prices or
/// volume. An empty slice is valid.
pub fn validate_sequence(candles: &[Candle]) -> Result<(), CandleError> {
    let mut previous: Option<i64> = None;

    for (index, candle) in candles.iter().enumerate() {
        for (field, value) in candle.fields() {
            if !value.is_finite() {
                return Err(CandleError::NotFinite {
                    index,
                    field,
                    value,
                });
            }
            if value < 0.0 {
                return Err(CandleError::Negative {
                    index,
                    field,
                    value,
                });
            }
        }

        if let Some(prev) = previous {
            if candle.time <= prev {
                return Err(CandleError::NonMonotonic {
                    index,
                    previous: prev,
                    current: candle.time,
                });
            }
        }
        previous = Some(candle.time);
    }

    Ok(())
}
