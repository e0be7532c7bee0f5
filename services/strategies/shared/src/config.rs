//! Strategy configuration utilities

use serde::{Deserialize, Serialize};

/// Common strategy configuration fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStrategyConfig {
    pub name: String,
    pub enabled: bool,
}

impl Default for BaseStrategyConfig {
    fn default() -> Self {
        Self {
            name: "unnamed_strategy".to_string(),
            enabled: true,
        }
    }
}
