//! Collaborator seams: candle sources and candle persistence

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};
use types::{Candle, Resolution, SeriesKey};

/// Source of ascending candle windows
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Most recent `limit` candles, the last one possibly still forming
    async fn fetch_window(&self, key: &SeriesKey, limit: usize) -> Result<Vec<Candle>>;

    /// Up to `limit` candles opening strictly before `before`, ascending
    async fn fetch_before(&self, key: &SeriesKey, before: i64, limit: usize) -> Result<Vec<Candle>>;
}

/// Persistence for closed candles
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Upsert candles by open time; returns how many were new
    async fn append(&self, key: &SeriesKey, candles: &[Candle]) -> Result<usize>;

    /// Up to `limit` stored candles opening strictly before `before`, ascending
    async fn query_before(&self, key: &SeriesKey, before: i64, limit: usize) -> Result<Vec<Candle>>;
}

fn tail_before(series: &[Candle], before: i64, limit: usize) -> Vec<Candle> {
    let end = series.partition_point(|c| c.time < before);
    series[end.saturating_sub(limit)..end].to_vec()
}

/// Candle store backed by ordered in-memory maps
#[derive(Debug, Default)]
pub struct InMemoryCandleStore {
    series: DashMap<SeriesKey, BTreeMap<i64, Candle>>,
}

impl InMemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, key: &SeriesKey) -> usize {
        self.series.get(key).map_or(0, |s| s.len())
    }
}

#[async_trait]
impl CandleStore for InMemoryCandleStore {
    async fn append(&self, key: &SeriesKey, candles: &[Candle]) -> Result<usize> {
        let mut series = self.series.entry(key.clone()).or_default();
        let mut added = 0;
        for candle in candles {
            if series.insert(candle.time, *candle).is_none() {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn query_before(&self, key: &SeriesKey, before: i64, limit: usize) -> Result<Vec<Candle>> {
        let Some(series) = self.series.get(key) else {
            return Ok(Vec::new());
        };
        let mut candles: Vec<Candle> = series
            .range(..before)
            .rev()
            .take(limit)
            .map(|(_, candle)| *candle)
            .collect();
        candles.reverse();
        Ok(candles)
    }
}

#[derive(Debug, Deserialize)]
struct ReplaySeries {
    instrument: String,
    resolution: Resolution,
    candles: Vec<Candle>,
}

struct ReplayCursor {
    candles: Vec<Candle>,
    fetches: AtomicUsize,
}

/// Provider that replays recorded series, revealing one more closed candle
/// every `ticks_per_candle` window fetches
pub struct ReplayProvider {
    series: HashMap<SeriesKey, ReplayCursor>,
    initial: usize,
    ticks_per_candle: usize,
}

impl ReplayProvider {
    pub fn new(initial: usize, ticks_per_candle: usize) -> Self {
        Self {
            series: HashMap::new(),
            initial,
            ticks_per_candle: ticks_per_candle.max(1),
        }
    }

    pub fn with_series(mut self, key: SeriesKey, candles: Vec<Candle>) -> Self {
        self.series.insert(
            key,
            ReplayCursor {
                candles,
                fetches: AtomicUsize::new(0),
            },
        );
        self
    }

    /// Load series from a JSON array of `{instrument, resolution, candles}`
    pub fn from_json_file(path: &Path, initial: usize, ticks_per_candle: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::provider(format!("reading {}: {e}", path.display())))?;
        let recorded: Vec<ReplaySeries> = serde_json::from_str(&raw)
            .map_err(|e| EngineError::provider(format!("parsing {}: {e}", path.display())))?;

        let mut provider = Self::new(initial, ticks_per_candle);
        for series in recorded {
            let key = SeriesKey::new(series.instrument, series.resolution);
            info!(key = %key, candles = series.candles.len(), "Loaded replay series");
            provider = provider.with_series(key, series.candles);
        }
        Ok(provider)
    }

    pub fn keys(&self) -> Vec<SeriesKey> {
        let mut keys: Vec<SeriesKey> = self.series.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn cursor(&self, key: &SeriesKey) -> Result<&ReplayCursor> {
        self.series
            .get(key)
            .ok_or_else(|| EngineError::provider(format!("no replay data for {key}")))
    }

    fn visible(&self, cursor: &ReplayCursor, fetches: usize) -> usize {
        (self.initial + fetches / self.ticks_per_candle).min(cursor.candles.len())
    }

    /// All recorded candles have been revealed
    pub fn is_exhausted(&self, key: &SeriesKey) -> bool {
        self.cursor(key).map_or(true, |cursor| {
            self.visible(cursor, cursor.fetches.load(Ordering::Relaxed)) == cursor.candles.len()
        })
    }
}

#[async_trait]
impl CandleProvider for ReplayProvider {
    async fn fetch_window(&self, key: &SeriesKey, limit: usize) -> Result<Vec<Candle>> {
        let cursor = self.cursor(key)?;
        let fetches = cursor.fetches.fetch_add(1, Ordering::Relaxed);
        let visible = self.visible(cursor, fetches);
        let start = visible.saturating_sub(limit);
        debug!(key = %key, visible, "Replay window");
        Ok(cursor.candles[start..visible].to_vec())
    }

    async fn fetch_before(&self, key: &SeriesKey, before: i64, limit: usize) -> Result<Vec<Candle>> {
        let cursor = self.cursor(key)?;
        let visible = self.visible(cursor, cursor.fetches.load(Ordering::Relaxed));
        Ok(tail_before(&cursor.candles[..visible], before, limit))
    }
}
