//! Order block detection

use crate::signals::{Zone, ZoneKind};
use types::Candle;

/// Find the last opposing candle before a momentum-confirmed reversal.
///
/// A bullish block is a net-down candle followed by a net-up candle whose body
/// exceeds `momentum_multiplier` times the down candle's body. The zone spans
/// the full range of the opposing candle.
pub fn detect_order_blocks(candles: &[Candle], momentum_multiplier: f64) -> Vec<Zone> {
    let Some(latest) = candles.last() else {
        return Vec::new();
    };

    let mut zones = Vec::new();
    for (i, pair) in candles.windows(2).enumerate() {
        let (opposing, reversal) = (&pair[0], &pair[1]);
        let strong_body = reversal.body() > opposing.body() * momentum_multiplier;

        if opposing.is_bearish() && reversal.is_bullish() && strong_body {
            zones.push(
                Zone::anchored(ZoneKind::BullishOrderBlock, opposing.high, opposing.low, i)
                    .with_distance_from(latest.close),
            );
        }

        if opposing.is_bullish() && reversal.is_bearish() && strong_body {
            zones.push(
                Zone::anchored(ZoneKind::BearishOrderBlock, opposing.high, opposing.low, i)
                    .with_distance_from(latest.close),
            );
        }
    }

    zones
}
