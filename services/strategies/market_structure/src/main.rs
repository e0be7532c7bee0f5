//! Market structure service binary
//!
//! Usage:
//!   market_structure --replay data/xauusd_replay.json
//!   market_structure --config config/market_structure.toml --environment dev --replay data/xauusd_replay.json
//!
//! Replays recorded candles through the engine and prints every update as a
//! JSON line on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use config::{expand_path, ConfigLoader, GlobalConfig};
use market_structure::{
    log_success, EngineConfig, InMemoryCandleStore, MarketStructureConfig, MarketStructureService,
    MarketStructureStrategy, ReplayProvider, SignalUpdate, UpdateKind,
};
use std::path::Path;
use std::sync::Arc;
use strategy_shared::Strategy;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "market_structure")]
#[command(about = "Market structure signal engine")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/market_structure.toml")]
    config: String,

    /// Environment overlay (loads environments/<name>.toml next to the config)
    #[arg(short, long)]
    environment: Option<String>,

    /// Recorded candles: JSON array of {instrument, resolution, candles}
    #[arg(short, long)]
    replay: String,

    /// Candles visible before the first refresh
    #[arg(long, default_value_t = 200)]
    initial_candles: usize,

    /// Refreshes per revealed candle
    #[arg(long, default_value_t = 3)]
    ticks_per_candle: usize,

    /// Print candle-only updates too
    #[arg(long)]
    all_updates: bool,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = expand_path(&args.config)?;
    let config = load_configuration(&config_path, args.environment.as_deref())?;

    init_logging(&args, &config.global)?;
    info!("Starting market structure engine");

    config
        .engine
        .validate()
        .context("Invalid market structure configuration")?;

    let replay_path = expand_path(&args.replay)?;
    let provider = ReplayProvider::from_json_file(&replay_path, args.initial_candles, args.ticks_per_candle)
        .with_context(|| format!("Failed to load replay data from {}", replay_path.display()))?;

    let mut series = config.engine.service.series.clone();
    series.retain(|key| provider.keys().contains(key));
    if series.is_empty() {
        warn!("No configured series found in replay data, polling every recorded series");
        series = provider.keys();
    }

    let queue_size = config.engine.service.update_queue_size;
    let service = MarketStructureService::new(config.engine, Arc::new(provider))
        .with_store(Arc::new(InMemoryCandleStore::new()));

    let (tx, rx) = mpsc::channel(queue_size);
    let mut strategy = MarketStructureStrategy::new(Arc::new(service), tx).with_series(series);
    let shutdown = strategy.shutdown_handle();

    let strategy_handle = tokio::spawn(async move {
        if let Err(e) = strategy.start().await {
            error!("Strategy failed: {:?}", e);
        }
        strategy.metrics()
    });
    let printer_handle = tokio::spawn(print_updates(rx, args.all_updates));

    info!("Market structure engine running. Press Ctrl+C to stop.");
    signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down market structure engine");
    shutdown.shutdown();

    let metrics = strategy_handle.await.context("Strategy task panicked")?;
    printer_handle.await.context("Printer task panicked")??;
    log_success!(
        "Stopped: {} refreshes, {} bundles, {} updates, {} errors",
        metrics.refreshes,
        metrics.bundles_computed,
        metrics.updates_emitted,
        metrics.errors
    );

    Ok(())
}

fn load_configuration(path: &Path, environment: Option<&str>) -> Result<MarketStructureConfig> {
    if !path.exists() {
        // Logging is not initialized yet
        eprintln!("Config file {} not found, using defaults", path.display());
        return Ok(MarketStructureConfig {
            global: GlobalConfig::default(),
            engine: EngineConfig::from_env(),
        });
    }

    let mut loader = ConfigLoader::new(path);
    if let Some(env) = environment {
        loader = loader.with_environment(env);
    }
    loader
        .load()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn init_logging(args: &Args, global: &GlobalConfig) -> Result<()> {
    let level = args.log_level.as_deref().unwrap_or(global.log_level.as_str());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.json_logs || global.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn print_updates(mut rx: mpsc::Receiver<SignalUpdate>, all_updates: bool) -> Result<()> {
    while let Some(update) = rx.recv().await {
        if update.kind == UpdateKind::CandleOnly && !all_updates {
            continue;
        }
        let line = serde_json::to_string(&update).context("Failed to encode update")?;
        println!("{line}");
    }
    Ok(())
}
