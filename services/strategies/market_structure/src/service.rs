//! Market structure service
//!
//! Glues the provider, the signal cache, the candle store and the live
//! windows together. `refresh` is the per-tick entry point; `load_older`
//! serves pagination.

use crate::assembler::assemble;
use crate::cache::{CacheStatus, SignalCache};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::history::{LiveWindow, MergeReport};
use crate::provider::{CandleProvider, CandleStore};
use crate::signals::SignalBundle;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::{Candle, SeriesKey};

/// What the delivery layer should transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A candle closed; signals were recomputed
    FullBundle,
    /// Only the forming candle changed
    CandleOnly,
}

/// One refresh result for a series
#[derive(Debug, Clone, Serialize)]
pub struct SignalUpdate {
    pub key: SeriesKey,
    pub latest_candle: Candle,
    pub candle_count: usize,
    pub bundle: Arc<SignalBundle>,
    pub kind: UpdateKind,
}

/// Result of a pagination request
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub report: MergeReport,
    /// The extended window after the merge
    pub window: LiveWindow,
}

pub struct MarketStructureService {
    config: EngineConfig,
    provider: Arc<dyn CandleProvider>,
    store: Option<Arc<dyn CandleStore>>,
    cache: SignalCache,
    windows: DashMap<SeriesKey, LiveWindow>,
}

impl MarketStructureService {
    pub fn new(config: EngineConfig, provider: Arc<dyn CandleProvider>) -> Self {
        let cache = SignalCache::new(config.cache);
        Self {
            config,
            provider,
            store: None,
            cache,
            windows: DashMap::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CandleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SignalCache {
        &self.cache
    }

    /// Copy of the live window for a series, if one has been built
    pub fn live_window(&self, key: &SeriesKey) -> Option<LiveWindow> {
        self.windows.get(key).map(|w| w.value().clone())
    }

    /// Fetch the current window and return its signals.
    ///
    /// Signals are recomputed only when the cache finds the window stale;
    /// otherwise the cached bundle is returned with the updated candle.
    pub async fn refresh(&self, key: &SeriesKey) -> Result<SignalUpdate> {
        let candles = self
            .provider
            .fetch_window(key, self.config.service.window_limit)
            .await?;
        let latest_candle = *candles.last().ok_or(EngineError::InsufficientData {
            required: 1,
            available: 0,
        })?;

        let window: Arc<[Candle]> = candles.into();
        let params = self.config.params_for(key.resolution);
        let lookup = self
            .cache
            .get_or_compute(key, Arc::clone(&window), move |candles| assemble(candles, params))
            .await?;

        let kind = if lookup.status.is_new_bundle() {
            UpdateKind::FullBundle
        } else {
            UpdateKind::CandleOnly
        };

        if matches!(lookup.status, CacheStatus::Computed | CacheStatus::Recomputed) {
            self.update_live_window(key, &window, &lookup.bundle)?;
            self.persist_closed(key, &window).await;
        }

        debug!(key = %key, ?kind, candles = window.len(), "Refreshed series");

        Ok(SignalUpdate {
            key: key.clone(),
            latest_candle,
            candle_count: window.len(),
            bundle: lookup.bundle,
            kind,
        })
    }

    /// Load a batch older than `before` and merge it into the live window.
    ///
    /// The store is consulted first; the provider fills in when the store
    /// cannot supply a full batch.
    pub async fn load_older(&self, key: &SeriesKey, before: i64) -> Result<HistoryPage> {
        let limit = self.config.service.history_batch_limit;

        let mut batch = match &self.store {
            Some(store) => store.query_before(key, before, limit).await?,
            None => Vec::new(),
        };

        if batch.len() < limit {
            let fetched = self.provider.fetch_before(key, before, limit).await?;
            if fetched.len() > batch.len() {
                if let Some(store) = &self.store {
                    if let Err(e) = store.append(key, &fetched).await {
                        warn!(key = %key, error = %e, "Failed to store history batch");
                    }
                }
                batch = fetched;
            }
        }

        let bundle = assemble(batch.clone().into(), self.config.params_for(key.resolution)).await?;

        let mut window = match self.windows.get_mut(key) {
            Some(window) => window,
            None => {
                let fresh = LiveWindow::new(key.clone(), Vec::new(), SignalBundle::empty(0))?;
                self.windows.entry(key.clone()).or_insert(fresh)
            }
        };
        let report = window.prepend_history(&batch, &bundle)?;

        info!(
            key = %key,
            before,
            added = report.added,
            duplicates = report.duplicates,
            window = window.len(),
            "Loaded older candles"
        );

        Ok(HistoryPage {
            report,
            window: window.value().clone(),
        })
    }

    async fn persist_closed(&self, key: &SeriesKey, window: &[Candle]) {
        let Some(store) = &self.store else {
            return;
        };
        // The last candle may still be forming
        let closed = &window[..window.len().saturating_sub(1)];
        match store.append(key, closed).await {
            Ok(added) => debug!(key = %key, added, "Stored closed candles"),
            Err(e) => warn!(key = %key, error = %e, "Failed to store closed candles"),
        }
    }

    /// Apply a recomputed window; windows older than the live one are dropped
    fn update_live_window(&self, key: &SeriesKey, window: &[Candle], bundle: &SignalBundle) -> Result<()> {
        match self.windows.entry(key.clone()) {
            Entry::Occupied(mut live) => {
                live.get_mut().replace_recent(window.to_vec(), bundle.clone())?;
            }
            Entry::Vacant(slot) => {
                slot.insert(LiveWindow::new(key.clone(), window.to_vec(), bundle.clone())?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryCandleStore, ReplayProvider};
    use strategy_shared::testing::zigzag_series;
    use types::Resolution;

    fn key() -> SeriesKey {
        SeriesKey::new("XAUUSD", Resolution::M5)
    }

    fn service(initial: usize, ticks: usize) -> (MarketStructureService, Arc<InMemoryCandleStore>) {
        let provider = ReplayProvider::new(initial, ticks).with_series(key(), zigzag_series(400, 100.0, 5.0, 6));
        let store = Arc::new(InMemoryCandleStore::new());
        let mut config = EngineConfig::default();
        config.service.window_limit = 120;
        config.service.history_batch_limit = 50;
        let service = MarketStructureService::new(config, Arc::new(provider)).with_store(store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn test_refresh_reports_full_bundle_only_on_close() {
        let (service, store) = service(200, 3);

        let kinds = [
            service.refresh(&key()).await.unwrap().kind,
            service.refresh(&key()).await.unwrap().kind,
            service.refresh(&key()).await.unwrap().kind,
            service.refresh(&key()).await.unwrap().kind,
        ];
        assert_eq!(
            kinds,
            [
                UpdateKind::FullBundle,
                UpdateKind::CandleOnly,
                UpdateKind::CandleOnly,
                UpdateKind::FullBundle
            ]
        );

        let stats = service.cache().stats();
        assert_eq!(stats.recomputations, 2);
        assert_eq!(stats.hits, 2);
        // Closed candles of the latest window were persisted
        assert_eq!(store.len(&key()), 120);
    }

    #[tokio::test]
    async fn test_load_older_extends_live_window() {
        let (service, _store) = service(200, 1);
        let update = service.refresh(&key()).await.unwrap();
        assert_eq!(update.candle_count, 120);

        let earliest = service.live_window(&key()).unwrap().earliest_time().unwrap();
        let page = service.load_older(&key(), earliest).await.unwrap();
        assert_eq!(page.report.added, 50);
        assert_eq!(page.window.len(), 170);
        assert_eq!(page.window.bundle().len(), 170);

        // Same request again is covered by the window
        let again = service.load_older(&key(), earliest).await.unwrap();
        assert!(again.report.is_noop());
        assert_eq!(again.window.len(), 170);
    }

    #[tokio::test]
    async fn test_unknown_series_is_a_provider_error() {
        let (service, _store) = service(10, 1);
        let missing = SeriesKey::new("EURUSD", Resolution::M5);
        assert!(matches!(
            service.refresh(&missing).await,
            Err(EngineError::Provider { .. })
        ));
    }

    /// Hands out pre-recorded windows in order
    struct ScriptedProvider {
        windows: parking_lot::Mutex<std::collections::VecDeque<Vec<Candle>>>,
    }

    #[async_trait::async_trait]
    impl CandleProvider for ScriptedProvider {
        async fn fetch_window(&self, _key: &SeriesKey, _limit: usize) -> Result<Vec<Candle>> {
            self.windows
                .lock()
                .pop_front()
                .ok_or_else(|| EngineError::provider("script exhausted"))
        }

        async fn fetch_before(&self, _key: &SeriesKey, _before: i64, _limit: usize) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }
    }

    /// Store whose first large append is slow
    struct SlowStore {
        inner: InMemoryCandleStore,
        slow_len: usize,
    }

    #[async_trait::async_trait]
    impl CandleStore for SlowStore {
        async fn append(&self, key: &SeriesKey, candles: &[Candle]) -> Result<usize> {
            if candles.len() == self.slow_len {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
            self.inner.append(key, candles).await
        }

        async fn query_before(&self, key: &SeriesKey, before: i64, limit: usize) -> Result<Vec<Candle>> {
            self.inner.query_before(key, before, limit).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_keep_newest_live_window() {
        let candles = zigzag_series(101, 100.0, 5.0, 6);
        let provider = ScriptedProvider {
            windows: parking_lot::Mutex::new([candles[..100].to_vec(), candles.clone()].into()),
        };
        let store = SlowStore {
            inner: InMemoryCandleStore::new(),
            slow_len: 99,
        };
        let service = MarketStructureService::new(EngineConfig::default(), Arc::new(provider))
            .with_store(Arc::new(store));

        let (key_a, key_b) = (key(), key());
        let (first, second) = tokio::join!(service.refresh(&key_a), service.refresh(&key_b));
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.kind, UpdateKind::FullBundle);
        assert_eq!(second.kind, UpdateKind::FullBundle);

        let live = service.live_window(&key()).unwrap();
        let cached = service.cache().peek(&key()).unwrap();
        assert_eq!(live.len(), 101);
        assert_eq!(cached.len(), 101);
        assert_eq!(live.bundle().swing_highs, cached.swing_highs);
        assert_eq!(live.candles().last().map(|c| c.time), candles.last().map(|c| c.time));
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl CandleStore for FailingStore {
        async fn append(&self, _key: &SeriesKey, _candles: &[Candle]) -> Result<usize> {
            Err(EngineError::provider("disk full"))
        }

        async fn query_before(&self, _key: &SeriesKey, _before: i64, _limit: usize) -> Result<Vec<Candle>> {
            Err(EngineError::provider("disk full"))
        }
    }

    #[tokio::test]
    async fn test_store_failures_do_not_fail_refresh() {
        let provider = ReplayProvider::new(100, 1).with_series(key(), zigzag_series(200, 100.0, 5.0, 6));
        let service = MarketStructureService::new(EngineConfig::default(), Arc::new(provider))
            .with_store(Arc::new(FailingStore));

        let update = service.refresh(&key()).await.unwrap();
        assert_eq!(update.kind, UpdateKind::FullBundle);
        assert_eq!(service.live_window(&key()).unwrap().len(), 100);

        // Pagination reads the store first and surfaces its failure
        let earliest = service.live_window(&key()).unwrap().earliest_time().unwrap();
        assert!(matches!(
            service.load_older(&key(), earliest).await,
            Err(EngineError::Provider { .. })
        ));
    }
}
