//! Delivery loop
//!
//! Polls every configured series on a fixed interval and forwards each
//! `SignalUpdate` to the streaming-delivery consumer over an mpsc channel.

use crate::error::EngineError;
use crate::service::{MarketStructureService, SignalUpdate, UpdateKind};
use crate::{log_candle, log_error, log_metrics, log_search, log_success, log_warning};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use strategy_shared::{MetricsCollector, Strategy, StrategyMetrics};
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;
use tracing::info;
use types::SeriesKey;

/// Poll rounds between statistics log lines
const STATS_EVERY_ROUNDS: u64 = 60;

/// Requests a running strategy to stop
#[derive(Clone)]
pub struct ShutdownHandle(Arc<Notify>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.notify_one();
    }
}

pub struct MarketStructureStrategy {
    service: Arc<MarketStructureService>,
    series: Vec<SeriesKey>,
    updates: mpsc::Sender<SignalUpdate>,
    metrics: Arc<MetricsCollector>,
    shutdown: Arc<Notify>,
}

impl MarketStructureStrategy {
    pub fn new(service: Arc<MarketStructureService>, updates: mpsc::Sender<SignalUpdate>) -> Self {
        let series = service.config().service.series.clone();
        Self {
            service,
            series,
            updates,
            metrics: Arc::new(MetricsCollector::new()),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Poll these series instead of the configured ones
    pub fn with_series(mut self, series: Vec<SeriesKey>) -> Self {
        self.series = series;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Refresh every series once; returns false when the consumer is gone
    pub async fn poll_once(&self) -> bool {
        let refreshes = self.series.iter().map(|key| self.service.refresh(key));
        let results = join_all(refreshes).await;

        for (key, result) in self.series.iter().zip(results) {
            self.metrics.increment_refreshes();
            match result {
                Ok(update) => {
                    if update.kind == UpdateKind::FullBundle {
                        self.metrics.increment_bundles();
                        let bundle = &update.bundle;
                        log_search!(
                            "{}: {} candles, {} FVG, {} OB, {} S/R, {} sweeps, {} breaks",
                            key,
                            update.candle_count,
                            bundle.fvg_zones.len(),
                            bundle.ob_zones.len(),
                            bundle.sr_zones.len(),
                            bundle.sweeps.len(),
                            bundle.break_signals.len()
                        );
                    } else {
                        log_candle!("{}: close {}", key, update.latest_candle.close);
                    }

                    if self.updates.send(update).await.is_err() {
                        log_warning!("Update consumer dropped, stopping delivery");
                        return false;
                    }
                    self.metrics.increment_updates();
                }
                Err(e @ EngineError::Provider { .. }) | Err(e @ EngineError::InsufficientData { .. }) => {
                    self.metrics.increment_errors();
                    log_warning!("{}: {}", key, e);
                }
                Err(e) => {
                    self.metrics.increment_errors();
                    log_error!("{}: {}", key, e);
                }
            }
        }
        true
    }

    fn log_stats(&self) {
        let cache = self.service.cache().stats();
        let metrics = self.metrics.get_metrics();
        log_metrics!(
            "refreshes={} bundles={} updates={} errors={} | cache hits={} recomputed={} coalesced={} stale={} failures={} uptime={}s",
            metrics.refreshes,
            metrics.bundles_computed,
            metrics.updates_emitted,
            metrics.errors,
            cache.hits,
            cache.recomputations,
            cache.coalesced,
            cache.stale_served,
            cache.failures,
            self.metrics.uptime().as_secs()
        );
    }
}

#[async_trait]
impl Strategy for MarketStructureStrategy {
    fn name(&self) -> &'static str {
        "market_structure"
    }

    async fn start(&mut self) -> Result<()> {
        if !self.service.config().strategy.enabled {
            info!("Strategy {} disabled in configuration", self.service.config().strategy.name);
            return Ok(());
        }

        let poll_interval = self.service.config().service.poll_interval();
        log_success!(
            "Market structure strategy started: {} series, polling every {:?}",
            self.series.len(),
            poll_interval
        );

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rounds: u64 = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.poll_once().await {
                        break;
                    }
                    rounds += 1;
                    if rounds % STATS_EVERY_ROUNDS == 0 {
                        self.log_stats();
                    }
                }
            }
        }

        self.log_stats();
        log_success!("Market structure strategy stopped after {} rounds", rounds);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.shutdown.notify_one();
        Ok(())
    }

    fn metrics(&self) -> StrategyMetrics {
        self.metrics.get_metrics()
    }
}
