//! Engine configuration

use config::defaults::{detectors, engine, zones};
use config::GlobalConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strategy_shared::{BaseStrategyConfig, StrategyConfig};
use types::{Resolution, SeriesKey};

/// Top-level layout of the service configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketStructureConfig {
    pub global: GlobalConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: BaseStrategyConfig,
    pub swing: SwingPresets,
    pub order_blocks: OrderBlockConfig,
    pub sweeps: SweepConfig,
    pub zones: ZoneConfig,
    pub cache: CacheConfig,
    pub service: ServiceSettings,
}

/// Symmetric look-back/look-ahead window for swing detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingWindow {
    pub left_bars: usize,
    pub right_bars: usize,
}

impl SwingWindow {
    pub const fn symmetric(bars: usize) -> Self {
        Self {
            left_bars: bars,
            right_bars: bars,
        }
    }

    /// Shortest sequence that can contain a swing point
    pub fn min_len(&self) -> usize {
        self.left_bars + self.right_bars + 1
    }
}

/// Swing windows by timeframe class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingPresets {
    /// 1m and 5m
    pub scalping: SwingWindow,
    /// 15m and 30m
    pub intraday: SwingWindow,
    /// 1h and slower
    pub swing: SwingWindow,
}

impl Default for SwingPresets {
    fn default() -> Self {
        Self {
            scalping: SwingWindow::symmetric(detectors::SWING_BARS_SCALPING),
            intraday: SwingWindow::symmetric(detectors::SWING_BARS_INTRADAY),
            swing: SwingWindow::symmetric(detectors::SWING_BARS_SWING),
        }
    }
}

impl SwingPresets {
    pub fn for_resolution(&self, resolution: Resolution) -> SwingWindow {
        match resolution {
            Resolution::M1 | Resolution::M5 => self.scalping,
            Resolution::M15 | Resolution::M30 => self.intraday,
            Resolution::H1 | Resolution::H4 | Resolution::D1 => self.swing,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBlockConfig {
    /// Reversal body must exceed this multiple of the opposing candle's body
    pub momentum_multiplier: f64,
}

impl Default for OrderBlockConfig {
    fn default() -> Self {
        Self {
            momentum_multiplier: detectors::ORDER_BLOCK_MOMENTUM_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Candles after a swing point inspected for a breach-and-reclaim
    pub lookahead: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lookahead: detectors::SWEEP_LOOKAHEAD,
        }
    }
}

/// Support/resistance clustering parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Max relative step from the previous cluster member
    pub join_tolerance: f64,
    /// Max relative distance from the first cluster member
    pub width_cap: f64,
    pub rejection_wick_ratio: f64,
    pub momentum_lookahead: usize,
    pub min_touches: usize,
    pub max_zones: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            join_tolerance: zones::JOIN_TOLERANCE,
            width_cap: zones::WIDTH_CAP,
            rejection_wick_ratio: zones::REJECTION_WICK_RATIO,
            momentum_lookahead: zones::MOMENTUM_LOOKAHEAD,
            min_touches: zones::MIN_TOUCHES,
            max_zones: zones::MAX_ZONES,
        }
    }
}

/// Signal that marks a cached bundle as stale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessKey {
    /// Window grew past the cached length
    CandleCount,
    /// Latest candle open time moved forward
    #[default]
    LatestTimestamp,
}

/// Behavior of a request that finds a recomputation already running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Wait for the running computation and share its result
    #[default]
    Wait,
    /// Return the previous bundle immediately when one exists
    ServeStale,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub staleness: StalenessKey,
    pub in_flight: InFlightPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub poll_interval_ms: u64,
    /// Candles requested per refresh
    pub window_limit: usize,
    /// Candles requested per pagination call
    pub history_batch_limit: usize,
    pub update_queue_size: usize,
    /// Series polled by the delivery loop
    pub series: Vec<SeriesKey>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: engine::POLL_INTERVAL_MS,
            window_limit: engine::WINDOW_LIMIT,
            history_batch_limit: engine::HISTORY_BATCH_LIMIT,
            update_queue_size: engine::UPDATE_QUEUE_SIZE,
            series: vec![
                SeriesKey::new("XAUUSD", Resolution::M5),
                SeriesKey::new("XAUUSD", Resolution::H1),
            ],
        }
    }
}

impl ServiceSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Detector parameters resolved for one series
#[derive(Debug, Clone, Copy)]
pub struct DetectorParams {
    pub swing: SwingWindow,
    pub order_block_multiplier: f64,
    pub sweep_lookahead: usize,
    pub zones: ZoneConfig,
}

impl Default for DetectorParams {
    fn default() -> Self {
        EngineConfig::default().params_for(Resolution::H1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: BaseStrategyConfig {
                name: "market_structure".to_string(),
                enabled: true,
            },
            swing: SwingPresets::default(),
            order_blocks: OrderBlockConfig::default(),
            sweeps: SweepConfig::default(),
            zones: ZoneConfig::default(),
            cache: CacheConfig::default(),
            service: ServiceSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides for the common knobs
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("MARKET_STRUCTURE_POLL_INTERVAL_MS") {
            if let Ok(value) = interval.parse::<u64>() {
                config.service.poll_interval_ms = value;
            }
        }

        if let Ok(limit) = std::env::var("MARKET_STRUCTURE_WINDOW_LIMIT") {
            if let Ok(value) = limit.parse::<usize>() {
                config.service.window_limit = value;
            }
        }

        if let Ok(staleness) = std::env::var("MARKET_STRUCTURE_STALENESS") {
            match staleness.to_lowercase().as_str() {
                "candle_count" => config.cache.staleness = StalenessKey::CandleCount,
                "latest_timestamp" => config.cache.staleness = StalenessKey::LatestTimestamp,
                _ => {}
            }
        }

        if let Ok(policy) = std::env::var("MARKET_STRUCTURE_IN_FLIGHT") {
            match policy.to_lowercase().as_str() {
                "wait" => config.cache.in_flight = InFlightPolicy::Wait,
                "serve_stale" => config.cache.in_flight = InFlightPolicy::ServeStale,
                _ => {}
            }
        }

        config
    }

    pub fn params_for(&self, resolution: Resolution) -> DetectorParams {
        DetectorParams {
            swing: self.swing.for_resolution(resolution),
            order_block_multiplier: self.order_blocks.momentum_multiplier,
            sweep_lookahead: self.sweeps.lookahead,
            zones: self.zones,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (class, window) in [
            ("scalping", self.swing.scalping),
            ("intraday", self.swing.intraday),
            ("swing", self.swing.swing),
        ] {
            if window.left_bars == 0 || window.right_bars == 0 {
                anyhow::bail!("swing.{class} windows must have at least one bar on each side");
            }
        }

        if !is_positive(self.order_blocks.momentum_multiplier) {
            anyhow::bail!("order_blocks.momentum_multiplier must be positive");
        }

        if self.sweeps.lookahead == 0 {
            anyhow::bail!("sweeps.lookahead must be at least 1");
        }

        let zones = &self.zones;
        if !is_positive(zones.join_tolerance) || !is_positive(zones.width_cap) {
            anyhow::bail!("zones.join_tolerance and zones.width_cap must be positive");
        }
        if zones.join_tolerance > zones.width_cap {
            anyhow::bail!("zones.join_tolerance must not exceed zones.width_cap");
        }
        if !(zones.rejection_wick_ratio > 0.0 && zones.rejection_wick_ratio < 1.0) {
            anyhow::bail!("zones.rejection_wick_ratio must be between 0 and 1");
        }
        if zones.max_zones == 0 {
            anyhow::bail!("zones.max_zones must be at least 1");
        }

        if self.service.poll_interval_ms == 0 {
            anyhow::bail!("service.poll_interval_ms must be positive");
        }
        if self.service.window_limit == 0 || self.service.history_batch_limit == 0 {
            anyhow::bail!("service window and batch limits must be positive");
        }
        if self.service.update_queue_size == 0 {
            anyhow::bail!("service.update_queue_size must be positive");
        }

        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl StrategyConfig for EngineConfig {
    fn validate(&self) -> anyhow::Result<()> {
        EngineConfig::validate(self)
    }
}
