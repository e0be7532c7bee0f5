//! Engine defaults
//!
//! Default configuration values shared by the market structure engine and
//! its binaries. Every value here can be overridden through configuration.

/// Detector thresholds
pub mod detectors {
    /// Swing window (left and right bars) for 1m/5m series
    pub const SWING_BARS_SCALPING: usize = 3;

    /// Swing window for 15m/30m series
    pub const SWING_BARS_INTRADAY: usize = 5;

    /// Swing window for 1h and slower series
    pub const SWING_BARS_SWING: usize = 7;

    /// Body of the reversal candle must exceed this multiple of the prior body
    pub const ORDER_BLOCK_MOMENTUM_MULTIPLIER: f64 = 1.5;

    /// Candles after a swing point inspected for a sweep
    pub const SWEEP_LOOKAHEAD: usize = 3;
}

/// Support/resistance clustering
pub mod zones {
    /// Max relative distance to the previous cluster member (0.05%)
    pub const JOIN_TOLERANCE: f64 = 0.0005;

    /// Max relative distance to the first cluster member (0.2%)
    pub const WIDTH_CAP: f64 = 0.002;

    /// Wick must exceed this fraction of the candle range to count as rejection
    pub const REJECTION_WICK_RATIO: f64 = 0.3;

    /// Closes after a swing point inspected for forward momentum
    pub const MOMENTUM_LOOKAHEAD: usize = 3;

    pub const MIN_TOUCHES: usize = 1;

    /// Zones retained after ranking
    pub const MAX_ZONES: usize = 5;
}

/// Engine service limits
pub mod engine {
    /// Candles requested from the provider per refresh
    pub const WINDOW_LIMIT: usize = 500;

    /// Candles requested per pagination call
    pub const HISTORY_BATCH_LIMIT: usize = 500;

    /// Interval between refreshes of each series (milliseconds)
    pub const POLL_INTERVAL_MS: u64 = 1_000;

    /// Capacity of the update channel towards the delivery layer
    pub const UPDATE_QUEUE_SIZE: usize = 1_000;
}
