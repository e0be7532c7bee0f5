//! Live window with history merging
//!
//! Consumers scrolling back through a chart request older batches. Each batch
//! arrives with its own bundle; merging it into the live window drops candles
//! already present (by timestamp), shifts signal indices onto the extended
//! window and collapses support/resistance levels that appear in both halves.

use crate::error::{EngineError, Result};
use crate::signals::{BreakSignal, LiquiditySweep, SignalBundle, Zone};
use std::collections::HashSet;
use tracing::debug;
use types::{validate_sequence, Candle, SeriesKey};

/// Outcome of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Candles added to the window
    pub added: usize,
    /// Incoming candles dropped as already covered
    pub duplicates: usize,
    /// Support/resistance zones collapsed by price
    pub merged_levels: usize,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.added == 0
    }
}

/// Candles and signals covering everything a consumer has loaded for a series
#[derive(Debug, Clone)]
pub struct LiveWindow {
    key: SeriesKey,
    candles: Vec<Candle>,
    bundle: SignalBundle,
}

impl LiveWindow {
    pub fn new(key: SeriesKey, candles: Vec<Candle>, bundle: SignalBundle) -> Result<Self> {
        check_alignment(&candles, &bundle)?;
        Ok(Self { key, candles, bundle })
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn bundle(&self) -> &SignalBundle {
        &self.bundle
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn earliest_time(&self) -> Option<i64> {
        self.candles.first().map(|c| c.time)
    }

    /// Prepend an older batch and its bundle.
    ///
    /// Only candles strictly older than the window's first candle are taken;
    /// a batch fully covered by the window leaves it untouched.
    pub fn prepend_history(&mut self, older: &[Candle], older_bundle: &SignalBundle) -> Result<MergeReport> {
        validate_sequence(older)?;
        check_alignment(older, older_bundle)?;

        let existing: HashSet<i64> = self.candles.iter().map(|c| c.time).collect();
        let cutoff = self.earliest_time().unwrap_or(i64::MAX);
        let take = older
            .iter()
            .take_while(|c| c.time < cutoff && !existing.contains(&c.time))
            .count();

        let mut report = MergeReport {
            added: take,
            duplicates: older.len() - take,
            merged_levels: 0,
        };
        if take == 0 {
            return Ok(report);
        }

        let mut candles = Vec::with_capacity(take + self.candles.len());
        candles.extend_from_slice(&older[..take]);
        candles.append(&mut self.candles);

        let recent = std::mem::take(&mut self.bundle);
        let (bundle, merged_levels) = splice(older_bundle, take, &recent, latest_close(&candles));

        self.candles = candles;
        self.bundle = bundle;
        report.merged_levels = merged_levels;

        debug!(
            key = %self.key,
            added = report.added,
            duplicates = report.duplicates,
            merged_levels,
            window = self.candles.len(),
            "Prepended history batch"
        );
        Ok(report)
    }

    /// Replace the recent part of the window with a freshly computed one,
    /// keeping any older history that precedes it.
    ///
    /// A window whose latest candle is older than the current one arrived out
    /// of order and is ignored; returns whether the window was applied.
    pub fn replace_recent(&mut self, recent: Vec<Candle>, recent_bundle: SignalBundle) -> Result<bool> {
        check_alignment(&recent, &recent_bundle)?;

        let (Some(first), Some(last)) = (recent.first().map(|c| c.time), recent.last().map(|c| c.time)) else {
            return Ok(false);
        };
        if let Some(current) = self.candles.last() {
            if last < current.time {
                debug!(
                    key = %self.key,
                    incoming = last,
                    current = current.time,
                    "Ignored out-of-order window"
                );
                return Ok(false);
            }
        }
        let keep = self.candles.iter().take_while(|c| c.time < first).count();

        let mut candles = Vec::with_capacity(keep + recent.len());
        candles.extend_from_slice(&self.candles[..keep]);
        candles.extend(recent);

        let (bundle, _) = splice(&self.bundle, keep, &recent_bundle, latest_close(&candles));
        self.candles = candles;
        self.bundle = bundle;
        Ok(true)
    }
}

fn check_alignment(candles: &[Candle], bundle: &SignalBundle) -> Result<()> {
    if bundle.swing_highs.len() != candles.len() || bundle.swing_lows.len() != candles.len() {
        return Err(EngineError::MisalignedBundle {
            expected: candles.len(),
            actual: bundle.swing_highs.len().min(bundle.swing_lows.len()),
        });
    }
    Ok(())
}

fn latest_close(candles: &[Candle]) -> f64 {
    candles.last().map_or(0.0, |c| c.close)
}

/// Join the first `prefix` candles' worth of `older` with all of `recent`,
/// shifting recent indices by `prefix`.
///
/// Support/resistance zones are collapsed by level, recent zones first, and
/// re-measured against `latest_close`. Returns the bundle and the number of
/// collapsed levels.
fn splice(older: &SignalBundle, prefix: usize, recent: &SignalBundle, latest_close: f64) -> (SignalBundle, usize) {
    let flags = |older: &[bool], recent: &[bool]| {
        older[..prefix]
            .iter()
            .chain(recent.iter())
            .copied()
            .collect::<Vec<bool>>()
    };

    let zones = |older: &[Zone], recent: &[Zone]| {
        older
            .iter()
            .filter(|z| z.anchor_index < prefix)
            .copied()
            .chain(recent.iter().map(|z| Zone {
                anchor_index: z.anchor_index + prefix,
                ..*z
            }))
            .map(|z| z.with_distance_from(latest_close))
            .collect::<Vec<Zone>>()
    };

    let sweeps: Vec<LiquiditySweep> = older
        .sweeps
        .iter()
        .filter(|s| s.index < prefix)
        .copied()
        .chain(recent.sweeps.iter().map(|s| LiquiditySweep {
            index: s.index + prefix,
            ..*s
        }))
        .collect();

    let break_signals: Vec<BreakSignal> = older
        .break_signals
        .iter()
        .filter(|b| b.index < prefix)
        .copied()
        .chain(recent.break_signals.iter().map(|b| BreakSignal {
            index: b.index + prefix,
            ..*b
        }))
        .collect();

    // Price-keyed dedupe of support/resistance levels
    let mut seen = HashSet::new();
    let mut merged_levels = 0;
    let mut sr_zones = Vec::new();
    let shifted_recent = recent.sr_zones.iter().map(|z| Zone {
        anchor_index: z.anchor_index + prefix,
        ..*z
    });
    let retained_older = older.sr_zones.iter().filter(|z| z.anchor_index < prefix).copied();
    for zone in shifted_recent.chain(retained_older) {
        if seen.insert(zone.reference_price().to_bits()) {
            sr_zones.push(zone.with_distance_from(latest_close));
        } else {
            merged_levels += 1;
        }
    }
    sr_zones.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let bundle = SignalBundle {
        swing_highs: flags(&older.swing_highs, &recent.swing_highs),
        swing_lows: flags(&older.swing_lows, &recent.swing_lows),
        fvg_zones: zones(&older.fvg_zones, &recent.fvg_zones),
        ob_zones: zones(&older.ob_zones, &recent.ob_zones),
        sr_zones,
        sweeps,
        break_signals,
    };
    (bundle, merged_levels)
}
