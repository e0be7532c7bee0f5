//! Liquidity sweep detection

use super::swing::SwingFlags;
use crate::signals::{LiquiditySweep, SweepKind};
use types::Candle;

/// Detect breach-and-reclaim moves through swing levels.
///
/// For each swing high, candles `i+1 ..= i+lookahead` are inspected for a
/// high above the swing high with a close back below it; swing lows mirror
/// this. The window is scanned from its far edge inward and the first match
/// is credited, so each swing point yields at most one sweep with
/// `strength = lookahead - (j - i) + 1`. Output is ordered by sweep index.
pub fn detect_liquidity_sweeps(candles: &[Candle], swings: &SwingFlags, lookahead: usize) -> Vec<LiquiditySweep> {
    let len = candles.len().min(swings.len());
    let mut sweeps = Vec::new();

    for i in 0..len {
        let last = i.saturating_add(lookahead).min(candles.len() - 1);

        if swings.highs[i] {
            let level = candles[i].high;
            let hit = (i + 1..=last)
                .rev()
                .find(|&j| candles[j].high > level && candles[j].close < level);
            if let Some(j) = hit {
                sweeps.push(LiquiditySweep {
                    index: j,
                    kind: SweepKind::Bearish,
                    swept_level: level,
                    strength: lookahead - (j - i) + 1,
                });
            }
        }

        if swings.lows[i] {
            let level = candles[i].low;
            let hit = (i + 1..=last)
                .rev()
                .find(|&j| candles[j].low < level && candles[j].close > level);
            if let Some(j) = hit {
                sweeps.push(LiquiditySweep {
                    index: j,
                    kind: SweepKind::Bullish,
                    swept_level: level,
                    strength: lookahead - (j - i) + 1,
                });
            }
        }
    }

    sweeps.sort_by_key(|sweep| sweep.index);
    sweeps
}
