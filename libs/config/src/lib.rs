//! # Centralized Configuration
//!
//! Configuration loading and shared defaults for the market structure services.
//!
//! ## Features
//!
//! - **Layered loading**: base TOML file, optional per-environment overlay,
//!   then `MSE_`-prefixed environment variables
//! - **Engine defaults**: detector thresholds, cache policy and service limits
//!   shared by the engine crate and its binaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::{defaults, ConfigLoader, GlobalConfig};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AppConfig {
//!     global: GlobalConfig,
//! }
//!
//! let app: AppConfig = ConfigLoader::new("config/market_structure.toml")
//!     .with_environment("dev")
//!     .load()
//!     .unwrap();
//! assert!(defaults::engine::WINDOW_LIMIT > 0);
//! ```

pub mod defaults;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{expand_path, load_config, ConfigLoader, GlobalConfig, ENV_PREFIX};
