//! Configuration management for the game hub binary.
//!
//! Loads the TOML configuration file, applies command-line overrides and
//! validates the result before it is turned into a [`HubConfig`].

use crate::cli::CliArgs;
use anyhow::{bail, Context, Result};
use game_hub::HubConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hub settings: network, queues, timings and origin policy
    #[serde(default)]
    pub server: HubConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind) = &args.bind {
            self.server.bind_address = bind.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Checks the configuration for values the hub cannot run with.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            bail!("Invalid bind address: {}", server.bind_address);
        }
        if server.outbound_queue_capacity == 0 {
            bail!("outbound_queue_capacity must be greater than zero");
        }
        if server.event_queue_capacity == 0 {
            bail!("event_queue_capacity must be greater than zero");
        }
        if server.max_message_size == 0 {
            bail!("max_message_size must be greater than zero");
        }
        if server.write_wait_secs == 0 || server.pong_wait_secs == 0 {
            bail!("write_wait_secs and pong_wait_secs must be greater than zero");
        }
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                self.logging.level
            );
        }
        Ok(())
    }

    pub fn hub_config(&self) -> HubConfig {
        self.server.clone()
    }
}
