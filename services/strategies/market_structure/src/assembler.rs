//! Signal bundle assembly
//!
//! Runs the detectors as a two-stage task graph on tokio's blocking pool:
//!
//! ```text
//! stage 1:  swings ──┐     gaps ─────────┐
//!                    │     order blocks ─┤
//! stage 2:  zones ◄──┤                   │
//!           sweeps ◄─┘                   │
//! barrier:  ─────────────────────────────┴──► breaks ──► SignalBundle
//! ```
//!
//! Gap and order block detection do not depend on swings and keep running
//! while stage 2 starts. Break signals need both gaps and zones, so they run
//! after the barrier. Any failed task aborts the whole bundle.

use crate::config::DetectorParams;
use crate::detectors::{
    cluster_sr_zones, detect_break_signals, detect_fair_value_gaps, detect_liquidity_sweeps, detect_order_blocks,
    detect_swings,
};
use crate::error::{EngineError, Result};
use crate::signals::SignalBundle;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::debug;
use types::{validate_sequence, Candle};

/// Validate the window and compute a complete bundle for it
pub async fn assemble(candles: Arc<[Candle]>, params: DetectorParams) -> Result<SignalBundle> {
    validate_sequence(&candles)?;

    if candles.is_empty() {
        return Ok(SignalBundle::empty(0));
    }

    let started = Instant::now();

    // Stage 1
    let swing_task = {
        let candles = Arc::clone(&candles);
        tokio::task::spawn_blocking(move || detect_swings(&candles, params.swing))
    };
    let gap_task = {
        let candles = Arc::clone(&candles);
        tokio::task::spawn_blocking(move || detect_fair_value_gaps(&candles))
    };
    let order_block_task = {
        let candles = Arc::clone(&candles);
        tokio::task::spawn_blocking(move || detect_order_blocks(&candles, params.order_block_multiplier))
    };

    let swings = Arc::new(join_task("swing detection", swing_task).await?);

    // Stage 2, gated on swings
    let zone_task = {
        let candles = Arc::clone(&candles);
        let swings = Arc::clone(&swings);
        tokio::task::spawn_blocking(move || cluster_sr_zones(&candles, &swings, &params.zones))
    };
    let sweep_task = {
        let candles = Arc::clone(&candles);
        let swings = Arc::clone(&swings);
        tokio::task::spawn_blocking(move || detect_liquidity_sweeps(&candles, &swings, params.sweep_lookahead))
    };

    let (fvg_zones, ob_zones, sr_zones, sweeps) = tokio::try_join!(
        join_task("gap detection", gap_task),
        join_task("order block detection", order_block_task),
        join_task("zone clustering", zone_task),
        join_task("sweep detection", sweep_task),
    )?;

    let (fvg_zones, sr_zones, break_signals) = {
        let candles = Arc::clone(&candles);
        let task = tokio::task::spawn_blocking(move || {
            let signals = detect_break_signals(&candles, &fvg_zones, &sr_zones);
            (fvg_zones, sr_zones, signals)
        });
        join_task("break detection", task).await?
    };

    let swings = Arc::try_unwrap(swings).unwrap_or_else(|shared| (*shared).clone());
    let bundle = SignalBundle {
        swing_highs: swings.highs,
        swing_lows: swings.lows,
        fvg_zones,
        ob_zones,
        sr_zones,
        sweeps,
        break_signals,
    };

    debug!(
        candles = candles.len(),
        fvg = bundle.fvg_zones.len(),
        order_blocks = bundle.ob_zones.len(),
        sr = bundle.sr_zones.len(),
        sweeps = bundle.sweeps.len(),
        breaks = bundle.break_signals.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Assembled signal bundle"
    );

    Ok(bundle)
}

/// Await a detector task, converting panics and cancellation into typed failures
pub(crate) async fn join_task<T>(stage: &'static str, handle: JoinHandle<T>) -> Result<T> {
    handle.await.map_err(|e| EngineError::ComputationFailure {
        stage,
        message: if e.is_panic() {
            "detector panicked".to_string()
        } else {
            e.to_string()
        },
    })
}
