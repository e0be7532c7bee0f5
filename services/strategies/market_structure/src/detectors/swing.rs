//! Swing extrema detection

use crate::config::SwingWindow;
use types::Candle;

/// Per-candle swing markers aligned to the input window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwingFlags {
    pub highs: Vec<bool>,
    pub lows: Vec<bool>,
}

impl SwingFlags {
    pub fn none(len: usize) -> Self {
        Self {
            highs: vec![false; len],
            lows: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty()
    }

    pub fn has_any(&self) -> bool {
        self.highs.iter().chain(self.lows.iter()).any(|&flag| flag)
    }
}

/// Mark candles whose high (low) strictly exceeds (undercuts) every neighbour
/// within `left_bars` before and `right_bars` after.
///
/// Edge candles without a full window on both sides are never marked. An
/// outside bar that clears both extremes is kept on one side only: a bearish
/// close marks a high, a bullish close a low, a flat close neither.
pub fn detect_swings(candles: &[Candle], window: SwingWindow) -> SwingFlags {
    let left = window.left_bars.max(1);
    let right = window.right_bars.max(1);
    let mut flags = SwingFlags::none(candles.len());

    if candles.len() < left + right + 1 {
        return flags;
    }

    for i in left..candles.len() - right {
        let pivot = &candles[i];
        let neighbours = candles[i - left..i]
            .iter()
            .chain(candles[i + 1..=i + right].iter());

        let mut is_high = true;
        let mut is_low = true;
        for other in neighbours {
            if pivot.high <= other.high {
                is_high = false;
            }
            if pivot.low >= other.low {
                is_low = false;
            }
            if !is_high && !is_low {
                break;
            }
        }

        if is_high && is_low {
            // Outside bar: the close decides which extreme was rejected
            is_high = pivot.is_bearish();
            is_low = pivot.is_bullish();
        }

        flags.highs[i] = is_high;
        flags.lows[i] = is_low;
    }

    flags
}
