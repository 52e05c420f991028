//! Application configuration, read from `dealdesk.toml`.

use crate::error::ConfigError;
use dealdesk_cloud::CloudConfig;
use dealdesk_priority::{CurrencyConfig, RateTable};
use dealdesk_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Top-level configuration. Every section is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite file holding the cache and the queue. `:memory:` keeps
    /// everything in memory.
    pub database_path: String,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Hosted store. Without it the app works from the local cache only.
    pub remote: Option<CloudConfig>,

    pub sync: SyncConfig,

    pub currency: CurrencyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "dealdesk.db".to_string(),
            log_level: "info".to_string(),
            remote: None,
            sync: SyncConfig::default(),
            currency: CurrencyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path is empty".into()));
        }
        if EnvFilter::try_new(&self.log_level).is_err() {
            return Err(ConfigError::Invalid(format!(
                "log_level {:?} is not a valid filter",
                self.log_level
            )));
        }
        if self.sync.command_buffer == 0 {
            return Err(ConfigError::Invalid(
                "sync.command_buffer must be at least 1".into(),
            ));
        }
        if let Some(remote) = &self.remote {
            if remote.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid("remote.base_url is empty".into()));
            }
            if remote.timeout_secs == 0 {
                return Err(ConfigError::Invalid(
                    "remote.timeout_secs must be at least 1".into(),
                ));
            }
        }
        RateTable::from_config(&self.currency)
            .map_err(|e| ConfigError::Invalid(format!("currency: {e}")))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
