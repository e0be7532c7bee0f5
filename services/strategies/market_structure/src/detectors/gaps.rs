//! Fair value gap detection

use crate::signals::{Zone, ZoneKind};
use types::Candle;

/// Scan three-candle windows for price gaps left by a displacement candle.
///
/// Bullish when the candle's low clears the high two bars back on a net-up
/// close; bearish is the mirror image. Gaps are anchored at the displacement
/// candle and are neither merged nor tracked for fills.
pub fn detect_fair_value_gaps(candles: &[Candle]) -> Vec<Zone> {
    let Some(latest) = candles.last() else {
        return Vec::new();
    };

    let mut zones = Vec::new();
    for i in 2..candles.len() {
        let origin = &candles[i - 2];
        let current = &candles[i];

        if current.low > origin.high && current.is_bullish() {
            zones.push(
                Zone::anchored(ZoneKind::BullishFvg, current.low, origin.high, i)
                    .with_distance_from(latest.close),
            );
        }

        if current.high < origin.low && current.is_bearish() {
            zones.push(
                Zone::anchored(ZoneKind::BearishFvg, origin.low, current.high, i)
                    .with_distance_from(latest.close),
            );
        }
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_shared::testing::candles_from_ohlc;

    #[test]
    fn test_bullish_gap_over_three_candles() {
        let candles = candles_from_ohlc(&[
            (100.0, 105.0, 98.0, 104.0),
            (104.0, 112.0, 103.0, 111.0),
            (111.0, 116.0, 110.0, 115.0),
        ]);

        let zones = detect_fair_value_gaps(&candles);
        assert_eq!(zones.len(), 1);

        let gap = zones[0];
        assert_eq!(gap.kind, ZoneKind::BullishFvg);
        assert_eq!(gap.bottom, 105.0);
        assert_eq!(gap.top, 110.0);
        assert_eq!(gap.gap_size, Some(5.0));
        assert_eq!(gap.anchor_index, 2);
        assert_eq!(gap.distance, 7.5);
    }

    #[test]
    fn test_bearish_gap_requires_net_down_candle() {
        let down = candles_from_ohlc(&[
            (110.0, 112.0, 108.0, 109.0),
            (109.0, 109.5, 101.0, 102.0),
            (102.0, 104.0, 99.0, 100.0),
        ]);
        let zones = detect_fair_value_gaps(&down);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].kind, ZoneKind::BearishFvg);
        assert_eq!(zones[0].top, 108.0);
        assert_eq!(zones[0].bottom, 104.0);
        assert_eq!(zones[0].gap_size, Some(4.0));

        // Same gap but closing up: no signal
        let up = candles_from_ohlc(&[
            (110.0, 112.0, 108.0, 109.0),
            (109.0, 109.5, 101.0, 102.0),
            (100.0, 104.0, 99.0, 103.0),
        ]);
        assert!(detect_fair_value_gaps(&up).is_empty());
    }

    #[test]
    fn test_short_windows_have_no_gaps() {
        assert!(detect_fair_value_gaps(&[]).is_empty());
        let two = candles_from_ohlc(&[(1.0, 2.0, 0.5, 1.5), (1.5, 3.0, 2.5, 2.8)]);
        assert!(detect_fair_value_gaps(&two).is_empty());
    }
}
