//! Support/resistance zone clustering
//!
//! Swing points are screened for rejection or momentum, sorted by price and
//! grouped into bands. Each band becomes one zone whose strength is the number
//! of touches it gathered. Selection favours strong, rejection-confirmed bands;
//! presentation orders the survivors by proximity to the latest close.

use super::swing::SwingFlags;
use crate::config::ZoneConfig;
use crate::signals::{Zone, ZoneKind};
use std::cmp::Ordering;
use types::Candle;

/// Swing price screened as a possible support/resistance touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCandidate {
    pub price: f64,
    pub kind: ZoneKind,
    pub index: usize,
    pub rejection: bool,
}

/// Build ranked support/resistance zones from swing output
pub fn cluster_sr_zones(candles: &[Candle], swings: &SwingFlags, config: &ZoneConfig) -> Vec<Zone> {
    let Some(latest) = candles.last() else {
        return Vec::new();
    };

    let candidates = extract_candidates(candles, swings, config);
    let zones = build_zones(candidates, latest.close, config);
    rank_zones(zones, config)
}

/// Screen swing points for rejection wicks or follow-through.
///
/// Falls back to every raw swing when none qualifies so that windows with
/// swings always produce levels.
pub fn extract_candidates(candles: &[Candle], swings: &SwingFlags, config: &ZoneConfig) -> Vec<LevelCandidate> {
    let len = candles.len().min(swings.len());
    let mut qualified = Vec::new();
    let mut raw = Vec::new();

    for index in 0..len {
        let candle = &candles[index];
        let end = (index + 1).saturating_add(config.momentum_lookahead).min(candles.len());
        let ahead = &candles[index + 1..end];

        if swings.lows[index] {
            let rejection = is_rejection(candle.lower_wick(), candle, config);
            let momentum = ahead.iter().any(|next| next.close > candle.high);
            let candidate = LevelCandidate {
                price: candle.low,
                kind: ZoneKind::Support,
                index,
                rejection,
            };
            if rejection || momentum {
                qualified.push(candidate);
            }
            raw.push(LevelCandidate {
                rejection: false,
                ..candidate
            });
        }

        if swings.highs[index] {
            let rejection = is_rejection(candle.upper_wick(), candle, config);
            let momentum = ahead.iter().any(|next| next.close < candle.low);
            let candidate = LevelCandidate {
                price: candle.high,
                kind: ZoneKind::Resistance,
                index,
                rejection,
            };
            if rejection || momentum {
                qualified.push(candidate);
            }
            raw.push(LevelCandidate {
                rejection: false,
                ..candidate
            });
        }
    }

    if qualified.is_empty() {
        raw
    } else {
        qualified
    }
}

fn is_rejection(wick: f64, candle: &Candle, config: &ZoneConfig) -> bool {
    wick > candle.body() && wick > candle.range() * config.rejection_wick_ratio
}

/// Relative distance of `price` from `reference`
pub fn relative_distance(price: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return if price == 0.0 { 0.0 } else { f64::INFINITY };
    }
    ((price - reference) / reference).abs()
}

/// Sort candidates by price and group them into one zone per cluster.
///
/// A candidate joins the open cluster only while it stays within
/// `join_tolerance` of the previous member and `width_cap` of the first.
pub fn build_zones(mut candidates: Vec<LevelCandidate>, latest_close: f64, config: &ZoneConfig) -> Vec<Zone> {
    candidates.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut zones = Vec::new();
    let mut cluster: Vec<LevelCandidate> = Vec::new();

    for candidate in candidates {
        let joins = match (cluster.first(), cluster.last()) {
            (Some(first), Some(previous)) => {
                relative_distance(candidate.price, previous.price) <= config.join_tolerance
                    && relative_distance(candidate.price, first.price) <= config.width_cap
            }
            _ => true,
        };

        if !joins {
            zones.push(synthesize(&cluster, latest_close));
            cluster.clear();
        }
        cluster.push(candidate);
    }

    if !cluster.is_empty() {
        zones.push(synthesize(&cluster, latest_close));
    }

    zones
}

fn synthesize(cluster: &[LevelCandidate], latest_close: f64) -> Zone {
    let count = cluster.len();
    let level = cluster.iter().map(|c| c.price).sum::<f64>() / count as f64;
    let top = cluster.iter().map(|c| c.price).fold(f64::MIN, f64::max);
    let bottom = cluster.iter().map(|c| c.price).fold(f64::MAX, f64::min);
    let resistance_votes = cluster.iter().filter(|c| c.kind == ZoneKind::Resistance).count();
    let support_votes = count - resistance_votes;

    let kind = match resistance_votes.cmp(&support_votes) {
        Ordering::Greater => ZoneKind::Resistance,
        Ordering::Less => ZoneKind::Support,
        Ordering::Equal if level > latest_close => ZoneKind::Resistance,
        Ordering::Equal => ZoneKind::Support,
    };

    Zone {
        kind,
        top,
        bottom,
        anchor_index: cluster.iter().map(|c| c.index).max().unwrap_or_default(),
        strength: count,
        distance: (latest_close - level).abs(),
        has_rejection_wick: cluster.iter().any(|c| c.rejection),
        gap_size: None,
        level: Some(level),
    }
}

/// Filter, keep the most significant zones, then order them by proximity
pub fn rank_zones(zones: Vec<Zone>, config: &ZoneConfig) -> Vec<Zone> {
    let mut zones: Vec<Zone> = zones
        .into_iter()
        .filter(|zone| zone.strength >= config.min_touches || zone.has_rejection_wick)
        .collect();

    zones.sort_by(|a, b| {
        b.strength
            .cmp(&a.strength)
            .then_with(|| b.has_rejection_wick.cmp(&a.has_rejection_wick))
            .then_with(|| a.distance.total_cmp(&b.distance))
    });
    zones.truncate(config.max_zones);

    zones.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    zones
}
