//! Error types for candle sequence validation
//!
//! A malformed window is fatal to the invocation that received it, so each
//! variant carries the offending index to make provider bugs easy to trace.

use std::fmt;
use thiserror::Error;

/// Price-valued fields of a candle, used to report which one failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while validating a candle sequence
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandleError {
    /// Timestamps must be strictly increasing within a sequence
    #[error("Non-monotonic timestamp at index {index}: {current} does not follow {previous}")]
    NonMonotonic {
        index: usize,
        previous: i64,
        current: i64,
    },

    /// Field is NaN or infinite
    #[error("Candle {index} has non-finite {field}: {value}")]
    NotFinite {
        index: usize,
        field: PriceField,
        value: f64,
    },

    /// Prices and volume cannot be negative
    #[error("Candle {index} has negative {field}: {value}")]
    Negative {
        index: usize,
        field: PriceField,
        value: f64,
    },
}

impl CandleError {
    /// Index of the offending candle within the validated sequence
    pub fn index(&self) -> usize {
        match self {
            CandleError::NonMonotonic { index, .. }
            | CandleError::NotFinite { index, .. }
            | CandleError::Negative { index, .. } => *index,
        }
    }
}
