//! CLI configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cartsync_engine::EngineConfig;

/// Default location of the persisted cart, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = ".cartsync/store.json";

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Where state is persisted.
    #[serde(default)]
    pub store: StoreConfig,

    /// Session defaults.
    #[serde(default)]
    pub session: SessionConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))?
        };

        config
            .engine
            .validate()
            .with_context(|| format!("Invalid config: {}", path))?;
        Ok(config)
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding the persisted keys.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Session defaults, overridable per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether promotional pricing applies.
    #[serde(default = "default_true")]
    pub eligible: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { eligible: true }
    }
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

fn default_true() -> bool {
    true
}
