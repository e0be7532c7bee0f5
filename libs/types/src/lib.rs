//! # Market Data Types
//!
//! Data contract shared by the market-structure engine and its collaborators.
//!
//! ## Design Philosophy
//!
//! - **Read-only input**: a candle sequence is owned by the caller and never
//!   mutated by the engine; detectors borrow it as a slice
//! - **Validated at the boundary**: [`validate_sequence`] rejects malformed
//!   windows (non-monotonic timestamps, NaN or negative prices) before any
//!   computation runs
//! - **Typed keys**: every cache entry and live window is addressed by a
//!   [`SeriesKey`] (instrument + [`Resolution`]) rather than ad hoc strings
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Candle, Resolution, SeriesKey, validate_sequence};
//!
//! let key = SeriesKey::new("XAUUSD", Resolution::H1);
//! let candles = vec![
//!     Candle::new(0, 100.0, 105.0, 95.0, 102.0, 10.0),
//!     Candle::new(3_600_000, 102.0, 106.0, 99.0, 104.0, 12.0),
//! ];
//! validate_sequence(&candles).unwrap();
//! assert_eq!(key.to_string(), "XAUUSD@1h");
//! ```

pub mod common;
pub mod market;

pub use common::errors::{CandleError, PriceField};
pub use common::identifiers::{ParseResolutionError, Resolution, SeriesKey};
pub use market::candle::{validate_sequence, Candle};

/// Convenience alias for candle validation results
pub type Result<T> = std::result::Result<T, CandleError>;
