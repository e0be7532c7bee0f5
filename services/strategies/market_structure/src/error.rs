//! Error types for the market structure engine

use thiserror::Error;
use types::CandleError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The window is too short for an operation that needs candles
    #[error("Insufficient data: need at least {required} candles, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Malformed candle: {0}")]
    MalformedCandle(#[from] CandleError),

    /// A detector task failed; the bundle for this invocation is discarded
    #[error("Computation failure in {stage}: {message}")]
    ComputationFailure { stage: &'static str, message: String },

    /// Signal arrays do not line up with the candles they describe
    #[error("Bundle covers {actual} candles but the window has {expected}")]
    MisalignedBundle { expected: usize, actual: usize },

    /// A candle source or candle store failed
    #[error("Provider error: {message}")]
    Provider { message: String },
}

impl EngineError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
