//! Service Configuration Module
//!
//! Provides layered configuration loading for the market structure services.
//! Supports loading from TOML files with environment-specific overrides.

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Prefix for environment variable overrides (`MSE_ENGINE__ZONES__MAX_ZONES=3`)
pub const ENV_PREFIX: &str = "MSE";

/// Global configuration settings shared by every service binary
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Builder for layered configuration loading
///
/// Sources are applied in order, later ones overriding earlier ones:
/// 1. the base TOML file
/// 2. `<base dir>/environments/<env>.toml` when an environment is selected
/// 3. environment variables with the configured prefix, `__` separating nested keys
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base: PathBuf,
    environment: Option<String>,
    env_prefix: String,
    base_required: bool,
}

impl ConfigLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            environment: None,
            env_prefix: ENV_PREFIX.to_string(),
            base_required: true,
        }
    }

    /// Select an environment overlay (`dev`, `prod`, ...)
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Allow a missing base file; struct defaults fill the gaps
    pub fn optional(mut self) -> Self {
        self.base_required = false;
        self
    }

    /// Path of the overlay file for the selected environment, if any
    pub fn overlay_path(&self) -> Option<PathBuf> {
        let env = self.environment.as_ref()?;
        let dir = self.base.parent().unwrap_or_else(|| Path::new("."));
        Some(dir.join("environments").join(format!("{}.toml", env)))
    }

    /// Build and deserialize the layered configuration
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        debug!("Loading base config: {:?}", self.base);

        let mut builder = Config::builder()
            .add_source(File::from(self.base.as_path()).required(self.base_required));

        // Add environment-specific overrides if specified
        if let Some(env_file) = self.overlay_path() {
            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

/// Convenience function to load configuration with the default prefix
pub fn load_config<T: DeserializeOwned>(base: &Path, environment: Option<&str>) -> Result<T> {
    let mut loader = ConfigLoader::new(base);
    if let Some(env) = environment {
        loader = loader.with_environment(env);
    }
    loader.load()
}

/// Expand `~` and `$VARS` in a configured path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("Failed to expand path '{}'", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
