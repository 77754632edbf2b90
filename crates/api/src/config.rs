//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `MEASURE_API__*` environment variables (`__` separates sections, e.g.
//! `MEASURE_API__STORE__DATABASE_URL`).

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use storage::StoreConfig;
use thiserror::Error;

/// Config file read when `MEASURE_API_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "measure-api.toml";

const ENV_PREFIX: &str = "MEASURE_API";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Path the record routes are mounted under
    pub api_prefix: String,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            api_prefix: "/api".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Settings {
    /// Load from the file named by `MEASURE_API_CONFIG` (or the default file) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("MEASURE_API_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit file path and the environment. A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("server.bind_addr: {}", e)))?;

        let prefix = &self.server.api_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.api_prefix must start with '/', got {:?}",
                prefix
            )));
        }

        if self.store.database_url.is_empty() {
            return Err(ConfigError::Invalid(
                "store.database_url must not be empty".to_string(),
            ));
        }

        self.log.level.parse::<tracing::Level>().map_err(|_| {
            ConfigError::Invalid(format!("log.level: unknown level {:?}", self.log.level))
        })?;

        Ok(())
    }
}
