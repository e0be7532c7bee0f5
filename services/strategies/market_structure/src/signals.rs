//! Signal definitions produced by the detectors

use serde::Serialize;
use types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

/// Swing extremum derived from a bundle and its candle window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingPoint {
    pub index: usize,
    pub time: i64,
    pub price: f64,
    pub kind: SwingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    BullishFvg,
    BearishFvg,
    BullishOrderBlock,
    BearishOrderBlock,
    Support,
    Resistance,
}

impl ZoneKind {
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::BullishFvg | Self::BearishFvg)
    }

    pub fn is_order_block(&self) -> bool {
        matches!(self, Self::BullishOrderBlock | Self::BearishOrderBlock)
    }

    pub fn is_support_resistance(&self) -> bool {
        matches!(self, Self::Support | Self::Resistance)
    }
}

/// Price band produced by the gap, order block or clustering detectors
///
/// `gap_size` is only set for gaps and `level` only for support/resistance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub top: f64,
    pub bottom: f64,
    /// Candle index the zone is anchored to (latest touch for clustered zones)
    pub anchor_index: usize,
    pub strength: usize,
    /// Absolute distance from the latest close
    pub distance: f64,
    pub has_rejection_wick: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
}

impl Zone {
    /// Single-candle zone (gap or order block)
    pub(crate) fn anchored(kind: ZoneKind, top: f64, bottom: f64, anchor_index: usize) -> Self {
        Self {
            kind,
            top,
            bottom,
            anchor_index,
            strength: 1,
            distance: 0.0,
            has_rejection_wick: false,
            gap_size: kind.is_gap().then_some(top - bottom),
            level: None,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Reference price used for distance: the cluster level, else the midpoint
    pub fn reference_price(&self) -> f64 {
        self.level.unwrap_or_else(|| self.midpoint())
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }

    pub(crate) fn with_distance_from(mut self, price: f64) -> Self {
        self.distance = (price - self.reference_price()).abs();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Swing low breached then reclaimed
    Bullish,
    /// Swing high breached then rejected
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiquiditySweep {
    /// Index of the sweeping candle
    pub index: usize,
    pub kind: SweepKind,
    pub swept_level: f64,
    /// Higher for faster reversals
    pub strength: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Buy,
    Sell,
}

/// Gap that followed a candle body crossing a support/resistance level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakSignal {
    /// Index of the gap candle
    pub index: usize,
    pub kind: BreakKind,
    /// Close of the gap candle
    pub price: f64,
}

/// Complete detector output for one candle window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalBundle {
    pub swing_highs: Vec<bool>,
    pub swing_lows: Vec<bool>,
    pub fvg_zones: Vec<Zone>,
    pub ob_zones: Vec<Zone>,
    pub sr_zones: Vec<Zone>,
    pub sweeps: Vec<LiquiditySweep>,
    pub break_signals: Vec<BreakSignal>,
}

impl SignalBundle {
    /// Bundle with no signals for a window of `len` candles
    pub fn empty(len: usize) -> Self {
        Self {
            swing_highs: vec![false; len],
            swing_lows: vec![false; len],
            ..Self::default()
        }
    }

    /// Number of candles the bundle is aligned to
    pub fn len(&self) -> usize {
        self.swing_highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swing_highs.is_empty()
    }

    pub fn swing_high_count(&self) -> usize {
        self.swing_highs.iter().filter(|&&flag| flag).count()
    }

    pub fn swing_low_count(&self) -> usize {
        self.swing_lows.iter().filter(|&&flag| flag).count()
    }

    /// Materialize swing points against the window the bundle was computed on
    pub fn swing_points(&self, candles: &[Candle]) -> Vec<SwingPoint> {
        let mut points = Vec::new();
        for (index, candle) in candles.iter().enumerate().take(self.len()) {
            if self.swing_highs[index] {
                points.push(SwingPoint {
                    index,
                    time: candle.time,
                    price: candle.high,
                    kind: SwingKind::High,
                });
            }
            if self.swing_lows[index] {
                points.push(SwingPoint {
                    index,
                    time: candle.time,
                    price: candle.low,
                    kind: SwingKind::Low,
                });
            }
        }
        points
    }

    /// Closest support/resistance zone, optionally restricted to one kind
    ///
    /// `sr_zones` is kept in ascending distance order, so the first match wins.
    pub fn nearest_sr(&self, kind: Option<ZoneKind>) -> Option<&Zone> {
        self.sr_zones
            .iter()
            .find(|zone| kind.map_or(true, |wanted| zone.kind == wanted))
    }
}
