//! Strategy traits and interfaces

use anyhow::Result;
use async_trait::async_trait;

/// Core trait that every long-running strategy service implements
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name for identification
    fn name(&self) -> &'static str;

    /// Start the strategy; resolves when the strategy has stopped
    async fn start(&mut self) -> Result<()>;

    /// Request a stop
    async fn stop(&mut self) -> Result<()>;

    /// Get current strategy metrics
    fn metrics(&self) -> StrategyMetrics;
}

/// Basic strategy metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyMetrics {
    /// Refresh requests processed
    pub refreshes: u64,
    /// Full signal bundles computed
    pub bundles_computed: u64,
    /// Updates handed to the delivery layer
    pub updates_emitted: u64,
    pub errors: u64,
}

/// Strategy configuration trait
pub trait StrategyConfig: Send + Sync + Clone {
    /// Validate configuration
    fn validate(&self) -> Result<()>;
}
