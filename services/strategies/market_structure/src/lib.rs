//! # Market Structure Strategy - Signal Detection Engine
//!
//! ## Purpose
//!
//! Derives market-structure signals from a rolling candle window for each
//! (instrument, resolution) series: swing extrema, fair value gaps, order
//! blocks, support/resistance zones, liquidity sweeps and level breaks. Results are cached
//! per series and only recomputed when a new candle closes, so a price tick on
//! the forming candle costs a cache lookup rather than a full detector run.
//!
//! ## Integration Points
//!
//! - **Input**: [`provider::CandleProvider`] supplies ascending candle windows
//! - **Persistence**: [`provider::CandleStore`] receives closed candles and
//!   serves pagination before the provider is asked
//! - **Output**: [`service::SignalUpdate`] values pushed over an mpsc channel
//!   by [`strategy::MarketStructureStrategy`]
//!
//! ## Architecture Role
//!
//! ```text
//! CandleProvider → [SignalCache] ──stale──→ [Assembler] → SignalBundle
//!                       │                    stage 1: swings | gaps | order blocks
//!                       │                    stage 2: zones | sweeps
//!                       │                    then:    breaks
//!                       └──fresh──→ cached Arc<SignalBundle>
//!                                        ↓
//!                         SignalUpdate {FullBundle | CandleOnly} → delivery
//! ```
//!
//! ## Examples
//!
//! ```rust,no_run
//! use market_structure::{EngineConfig, MarketStructureService, ReplayProvider};
//! use std::sync::Arc;
//! use types::{Resolution, SeriesKey};
//!
//! # async fn run(candles: Vec<types::Candle>) -> market_structure::Result<()> {
//! let key = SeriesKey::new("XAUUSD", Resolution::M5);
//! let provider = ReplayProvider::new(200, 1).with_series(key.clone(), candles);
//! let service = MarketStructureService::new(EngineConfig::default(), Arc::new(provider));
//!
//! let update = service.refresh(&key).await?;
//! if let Some(zone) = update.bundle.nearest_sr(None) {
//!     println!("nearest level {:?} ({:?})", zone.level, zone.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod detectors;
pub mod error;
pub mod history;
pub mod logging;
pub mod provider;
pub mod service;
pub mod signals;
pub mod strategy;

pub use assembler::assemble;
pub use cache::{CacheLookup, CacheStats, CacheStatus, EntrySnapshot, SignalCache};
pub use self::config::{
    CacheConfig, DetectorParams, EngineConfig, InFlightPolicy, MarketStructureConfig, StalenessKey,
    SwingWindow, ZoneConfig,
};
pub use error::{EngineError, Result};
pub use history::{LiveWindow, MergeReport};
pub use provider::{CandleProvider, CandleStore, InMemoryCandleStore, ReplayProvider};
pub use service::{HistoryPage, MarketStructureService, SignalUpdate, UpdateKind};
pub use signals::{
    BreakKind, BreakSignal, LiquiditySweep, SignalBundle, SweepKind, SwingKind, SwingPoint, Zone, ZoneKind,
};
pub use strategy::{MarketStructureStrategy, ShutdownHandle};
