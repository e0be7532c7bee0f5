//! Incremental signal cache
//!
//! One slot per series key. A slot holds the last good entry behind a
//! read-write lock and a per-key async mutex that serializes recomputation,
//! so readers never block on a running computation and at most one
//! computation per key is in flight.
//!
//! ## Staleness
//!
//! An entry is reused while the latest candle's open time has not moved
//! forward (`StalenessKey::LatestTimestamp`) or, when configured, while the
//! window has not grown past the cached length (`StalenessKey::CandleCount`).
//! Updates to the forming candle never trigger recomputation under either key.
//! Count keying misses a window that is trimmed and extended between checks.

use crate::config::{CacheConfig, InFlightPolicy, StalenessKey};
use crate::error::Result;
use crate::signals::SignalBundle;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, info};
use types::{Candle, SeriesKey};

/// Cached bundle and the window shape it was computed for
#[derive(Debug)]
pub struct CacheEntry {
    pub candle_count: usize,
    /// Open time of the latest candle in the window
    pub latest_time: i64,
    pub bundle: Arc<SignalBundle>,
    pub computed_at: SystemTime,
}

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Cached bundle was current
    Hit,
    /// First computation for the key
    Computed,
    /// Window advanced and this request recomputed
    Recomputed,
    /// Waited on another request's computation and shared its result
    Joined,
    /// Another computation was running; the previous bundle was returned
    ServedStale,
}

impl CacheStatus {
    /// The returned bundle differs from what was cached before the request
    pub fn is_new_bundle(&self) -> bool {
        matches!(self, Self::Computed | Self::Recomputed | Self::Joined)
    }
}

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub bundle: Arc<SignalBundle>,
    pub status: CacheStatus,
}

/// Aggregate counters across all keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub recomputations: u64,
    pub coalesced: u64,
    pub stale_served: u64,
    pub failures: u64,
}

/// Point-in-time view of one key
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub key: SeriesKey,
    pub last_candle_count: usize,
    pub last_candle_time: i64,
    pub computed_at: SystemTime,
    pub swing_highs: usize,
    pub swing_lows: usize,
    pub fvg_zones: usize,
    pub ob_zones: usize,
    pub sr_zones: usize,
    pub sweeps: usize,
    pub break_signals: usize,
}

struct CacheSlot {
    entry: RwLock<Option<Arc<CacheEntry>>>,
    compute_lock: tokio::sync::Mutex<()>,
}

impl CacheSlot {
    fn new() -> Self {
        Self {
            entry: RwLock::new(None),
            compute_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn current(&self) -> Option<Arc<CacheEntry>> {
        self.entry.read().clone()
    }
}

/// Per-series cache of signal bundles with single-flight recomputation
pub struct SignalCache {
    slots: DashMap<SeriesKey, Arc<CacheSlot>>,
    config: CacheConfig,
    hits: AtomicU64,
    recomputations: AtomicU64,
    coalesced: AtomicU64,
    stale_served: AtomicU64,
    failures: AtomicU64,
}

impl SignalCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            slots: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            recomputations: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn slot(&self, key: &SeriesKey) -> Arc<CacheSlot> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(CacheSlot::new()))
                .value(),
        )
    }

    fn is_stale(&self, entry: &CacheEntry, candles: &[Candle]) -> bool {
        match self.config.staleness {
            StalenessKey::CandleCount => candles.len() > entry.candle_count,
            StalenessKey::LatestTimestamp => candles
                .last()
                .map_or(false, |latest| latest.time > entry.latest_time),
        }
    }

    /// Return the bundle for `candles`, computing it with `compute` when the
    /// cached entry is missing or stale.
    ///
    /// A failed computation is returned to the caller and leaves the previous
    /// entry in place.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &SeriesKey,
        candles: Arc<[Candle]>,
        compute: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce(Arc<[Candle]>) -> Fut,
        Fut: Future<Output = Result<SignalBundle>>,
    {
        let slot = self.slot(key);
        let previous = slot.current();

        if let Some(entry) = &previous {
            if !self.is_stale(entry, &candles) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, candles = candles.len(), "Signal cache hit");
                return Ok(CacheLookup {
                    bundle: Arc::clone(&entry.bundle),
                    status: CacheStatus::Hit,
                });
            }
        }

        let _guard = match (self.config.in_flight, &previous) {
            (InFlightPolicy::ServeStale, Some(entry)) => match slot.compute_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    self.stale_served.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Recomputation in flight, serving previous bundle");
                    return Ok(CacheLookup {
                        bundle: Arc::clone(&entry.bundle),
                        status: CacheStatus::ServedStale,
                    });
                }
            },
            _ => slot.compute_lock.lock().await,
        };

        // Another request may have finished while we waited for the lock
        let current = slot.current();
        if let Some(entry) = &current {
            let advanced = previous
                .as_ref()
                .map_or(true, |seen| !Arc::ptr_eq(seen, entry));
            if advanced && !self.is_stale(entry, &candles) {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Joined in-flight recomputation");
                return Ok(CacheLookup {
                    bundle: Arc::clone(&entry.bundle),
                    status: CacheStatus::Joined,
                });
            }
        }

        let started = Instant::now();
        let candle_count = candles.len();
        let latest_time = candles.last().map_or(i64::MIN, |c| c.time);

        match compute(candles).await {
            Ok(bundle) => {
                let entry = Arc::new(CacheEntry {
                    candle_count,
                    latest_time,
                    bundle: Arc::new(bundle),
                    computed_at: SystemTime::now(),
                });
                *slot.entry.write() = Some(Arc::clone(&entry));
                self.recomputations.fetch_add(1, Ordering::Relaxed);

                let status = if current.is_some() {
                    CacheStatus::Recomputed
                } else {
                    CacheStatus::Computed
                };
                info!(
                    key = %key,
                    candles = candle_count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ?status,
                    "Signal bundle recomputed"
                );

                Ok(CacheLookup {
                    bundle: Arc::clone(&entry.bundle),
                    status,
                })
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    key = %key,
                    candles = candle_count,
                    error = %e,
                    kept_previous = current.is_some(),
                    "Signal computation failed"
                );
                Err(e)
            }
        }
    }

    /// Last good bundle for a key without triggering computation
    pub fn peek(&self, key: &SeriesKey) -> Option<Arc<SignalBundle>> {
        self.slots
            .get(key)
            .and_then(|slot| slot.current())
            .map(|entry| Arc::clone(&entry.bundle))
    }

    /// Drop a key's entry; the next request recomputes.
    ///
    /// The slot and its compute lock stay in place, so a computation already
    /// running for the key is joined rather than duplicated.
    pub fn invalidate(&self, key: &SeriesKey) -> bool {
        let Some(slot) = self.slots.get(key).map(|slot| Arc::clone(slot.value())) else {
            return false;
        };
        let dropped = slot.entry.write().take().is_some();
        if dropped {
            debug!(key = %key, "Signal cache entry invalidated");
        }
        dropped
    }

    pub fn snapshot(&self, key: &SeriesKey) -> Option<EntrySnapshot> {
        let entry = self.slots.get(key)?.current()?;
        let bundle = &entry.bundle;
        Some(EntrySnapshot {
            key: key.clone(),
            last_candle_count: entry.candle_count,
            last_candle_time: entry.latest_time,
            computed_at: entry.computed_at,
            swing_highs: bundle.swing_high_count(),
            swing_lows: bundle.swing_low_count(),
            fvg_zones: bundle.fvg_zones.len(),
            ob_zones: bundle.ob_zones.len(),
            sr_zones: bundle.sr_zones.len(),
            sweeps: bundle.sweeps.len(),
            break_signals: bundle.break_signals.len(),
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.iter().filter(|slot| slot.current().is_some()).count(),
            hits: self.hits.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for SignalCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::sync::atomic::AtomicUsize;
    use strategy_shared::testing::{push_next_candle, zigzag_series};
    use types::Resolution;

    fn key() -> SeriesKey {
        SeriesKey::new("XAUUSD", Resolution::M5)
    }

    async fn lookup(cache: &SignalCache, candles: &[Candle], runs: &AtomicUsize) -> Result<CacheLookup> {
        cache
            .get_or_compute(&key(), candles.to_vec().into(), |window| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(SignalBundle::empty(window.len()))
            })
            .await
    }

    #[tokio::test]
    async fn test_same_count_serves_same_bundle() {
        let cache = SignalCache::default();
        let runs = AtomicUsize::new(0);
        let candles = zigzag_series(50, 100.0, 5.0, 5);

        let first = lookup(&cache, &candles, &runs).await.unwrap();
        assert_eq!(first.status, CacheStatus::Computed);

        for _ in 0..10 {
            let again = lookup(&cache, &candles, &runs).await.unwrap();
            assert_eq!(again.status, CacheStatus::Hit);
            assert!(Arc::ptr_eq(&first.bundle, &again.bundle));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 10);
    }

    #[tokio::test]
    async fn test_forming_candle_update_is_a_hit() {
        let cache = SignalCache::default();
        let runs = AtomicUsize::new(0);
        let mut candles = zigzag_series(50, 100.0, 5.0, 5);
        lookup(&cache, &candles, &runs).await.unwrap();

        candles.last_mut().unwrap().close += 0.5;
        let lookup_result = lookup(&cache, &candles, &runs).await.unwrap();
        assert_eq!(lookup_result.status, CacheStatus::Hit);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_candle_triggers_one_recomputation() {
        let cache = SignalCache::default();
        let runs = AtomicUsize::new(0);
        let mut candles = zigzag_series(50, 100.0, 5.0, 5);
        let first = lookup(&cache, &candles, &runs).await.unwrap();

        push_next_candle(&mut candles, 101.0);
        let second = lookup(&cache, &candles, &runs).await.unwrap();
        assert_eq!(second.status, CacheStatus::Recomputed);
        assert!(!Arc::ptr_eq(&first.bundle, &second.bundle));
        assert_eq!(second.bundle.len(), 51);

        let third = lookup(&cache, &candles, &runs).await.unwrap();
        assert_eq!(third.status, CacheStatus::Hit);
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        let snapshot = cache.snapshot(&key()).unwrap();
        assert_eq!(snapshot.last_candle_count, 51);
        assert_eq!(snapshot.last_candle_time, candles.last().unwrap().time);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_entry() {
        let cache = SignalCache::default();
        let runs = AtomicUsize::new(0);
        let mut candles = zigzag_series(40, 100.0, 5.0, 5);
        let good = lookup(&cache, &candles, &runs).await.unwrap();

        push_next_candle(&mut candles, 99.0);
        let err = cache
            .get_or_compute(&key(), candles.clone().into(), |_| async {
                Err(EngineError::ComputationFailure {
                    stage: "zone clustering",
                    message: "injected".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ComputationFailure { .. }));
        assert!(Arc::ptr_eq(&cache.peek(&key()).unwrap(), &good.bundle));
        assert_eq!(cache.stats().failures, 1);

        // Still stale, so the next request retries
        let retry = lookup(&cache, &candles, &runs).await.unwrap();
        assert_eq!(retry.status, CacheStatus::Recomputed);
    }

    #[tokio::test]
    async fn test_count_policy_misses_trim_and_extend() {
        let runs = AtomicUsize::new(0);
        let mut candles = zigzag_series(30, 100.0, 5.0, 5);

        let count_cache = SignalCache::new(CacheConfig {
            staleness: StalenessKey::CandleCount,
            ..CacheConfig::default()
        });
        let ts_cache = SignalCache::default();
        lookup(&count_cache, &candles, &runs).await.unwrap();
        lookup(&ts_cache, &candles, &runs).await.unwrap();

        // Window slides: oldest candle dropped, one new candle appended
        push_next_candle(&mut candles, 102.0);
        candles.remove(0);

        let by_count = lookup(&count_cache, &candles, &runs).await.unwrap();
        assert_eq!(by_count.status, CacheStatus::Hit);

        let by_time = lookup(&ts_cache, &candles, &runs).await.unwrap();
        assert_eq!(by_time.status, CacheStatus::Recomputed);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = SignalCache::default();
        let candles: Arc<[Candle]> = zigzag_series(20, 100.0, 5.0, 5).into();
        let other = SeriesKey::new("XAUUSD", Resolution::H1);

        for k in [key(), other.clone()] {
            let result = cache
                .get_or_compute(&k, Arc::clone(&candles), |w| async move { Ok(SignalBundle::empty(w.len())) })
                .await
                .unwrap();
            assert_eq!(result.status, CacheStatus::Computed);
        }
        assert_eq!(cache.stats().entries, 2);

        assert!(cache.invalidate(&other));
        assert!(!cache.invalidate(&other));
        assert!(cache.peek(&other).is_none());
        assert!(cache.peek(&key()).is_some());
        assert_eq!(cache.stats().entries, 1);
    }
}
