//! Strategy metrics collection

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe metrics collector for strategies
#[derive(Debug)]
pub struct MetricsCollector {
    start_time: Instant,
    refreshes: AtomicU64,
    bundles_computed: AtomicU64,
    updates_emitted: AtomicU64,
    errors: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            refreshes: AtomicU64::new(0),
            bundles_computed: AtomicU64::new(0),
            updates_emitted: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn increment_refreshes(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_bundles(&self) {
        self.bundles_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> super::StrategyMetrics {
        super::StrategyMetrics {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            bundles_computed: self.bundles_computed.load(Ordering::Relaxed),
            updates_emitted: self.updates_emitted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
