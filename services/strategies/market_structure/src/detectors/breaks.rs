//! Level break signals

use crate::signals::{BreakKind, BreakSignal, Zone, ZoneKind};
use types::Candle;

/// Flag gaps whose preceding candle body crossed a support/resistance level.
///
/// A bullish gap after a candle that opened below and closed above a
/// resistance level is a buy; a bearish gap after a candle that opened above
/// and closed below a support level is a sell. At most one signal per gap,
/// priced at the gap candle's close and ordered by index.
pub fn detect_break_signals(candles: &[Candle], fvg_zones: &[Zone], sr_zones: &[Zone]) -> Vec<BreakSignal> {
    let levels = |kind: ZoneKind| {
        sr_zones
            .iter()
            .filter(move |zone| zone.kind == kind)
            .filter_map(|zone| zone.level)
    };

    let mut signals: Vec<BreakSignal> = fvg_zones
        .iter()
        .filter(|gap| gap.anchor_index >= 1 && gap.anchor_index < candles.len())
        .filter_map(|gap| {
            let index = gap.anchor_index;
            let body = &candles[index - 1];
            let kind = match gap.kind {
                ZoneKind::BullishFvg
                    if levels(ZoneKind::Resistance).any(|lvl| body.open < lvl && lvl < body.close) =>
                {
                    BreakKind::Buy
                }
                ZoneKind::BearishFvg if levels(ZoneKind::Support).any(|lvl| body.open > lvl && lvl > body.close) => {
                    BreakKind::Sell
                }
                _ => return None,
            };
            Some(BreakSignal {
                index,
                kind,
                price: candles[index].close,
            })
        })
        .collect();

    signals.sort_by_key(|signal| signal.index);
    signals.dedup_by_key(|signal| signal.index);
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_shared::testing::candles_from_ohlc;

    fn level(kind: ZoneKind, price: f64) -> Zone {
        Zone {
            kind,
            top: price,
            bottom: price,
            anchor_index: 0,
            strength: 1,
            distance: 0.0,
            has_rejection_wick: false,
            gap_size: None,
            level: Some(price),
        }
    }

    fn rising() -> Vec<Candle> {
        candles_from_ohlc(&[
            (100.0, 105.0, 98.0, 104.0),
            (104.0, 112.0, 103.0, 111.0),
            (111.0, 116.0, 110.0, 115.0),
        ])
    }

    fn falling() -> Vec<Candle> {
        candles_from_ohlc(&[
            (115.0, 116.0, 110.0, 111.0),
            (111.0, 112.0, 103.0, 104.0),
            (104.0, 105.0, 98.0, 100.0),
        ])
    }

    #[test]
    fn test_bullish_gap_through_resistance_is_buy() {
        let candles = rising();
        let gaps = [Zone::anchored(ZoneKind::BullishFvg, 110.0, 105.0, 2)];
        let levels = [level(ZoneKind::Support, 99.0), level(ZoneKind::Resistance, 108.0)];

        let signals = detect_break_signals(&candles, &gaps, &levels);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, BreakKind::Buy);
        assert_eq!(signals[0].index, 2);
        assert_eq!(signals[0].price, 115.0);
    }

    #[test]
    fn test_bearish_gap_through_support_is_sell() {
        let candles = falling();
        let gaps = [Zone::anchored(ZoneKind::BearishFvg, 110.0, 105.0, 2)];
        let levels = [level(ZoneKind::Support, 107.0)];

        let signals = detect_break_signals(&candles, &gaps, &levels);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, BreakKind::Sell);
        assert_eq!(signals[0].price, 100.0);
    }

    #[test]
    fn test_level_outside_body_or_wrong_side_is_ignored() {
        let candles = rising();
        let gaps = [Zone::anchored(ZoneKind::BullishFvg, 110.0, 105.0, 2)];

        // Inside the wick only
        assert!(detect_break_signals(&candles, &gaps, &[level(ZoneKind::Resistance, 111.5)]).is_empty());
        // Support is not a breakout level for a bullish gap
        assert!(detect_break_signals(&candles, &gaps, &[level(ZoneKind::Support, 108.0)]).is_empty());
        // Exact touch of the open does not count
        assert!(detect_break_signals(&candles, &gaps, &[level(ZoneKind::Resistance, 104.0)]).is_empty());
    }

    #[test]
    fn test_no_gaps_no_signals() {
        let candles = rising();
        assert!(detect_break_signals(&candles, &[], &[level(ZoneKind::Resistance, 108.0)]).is_empty());
        assert!(detect_break_signals(&[], &[], &[]).is_empty());
    }
}
