//! Pattern detectors
//!
//! Every detector is a pure function over a borrowed candle window. Windows
//! too short for a detector yield empty output rather than an error.

pub mod breaks;
pub mod gaps;
pub mod order_blocks;
pub mod sweeps;
pub mod swing;
pub mod zones;

pub use breaks::detect_break_signals;
pub use gaps::detect_fair_value_gaps;
pub use order_blocks::detect_order_blocks;
pub use sweeps::detect_liquidity_sweeps;
pub use swing::{detect_swings, SwingFlags};
pub use zones::cluster_sr_zones;
