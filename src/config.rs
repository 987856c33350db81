//! Configuration types for market-tracker
//!
//! Loaded from TOML; every field has a default so an empty file (or no file
//! at all) yields a runnable configuration. A handful of environment
//! variables override the file for container deployments.

use crate::hub::HubConfig;
use crate::ingest::interval_from_minutes;
use crate::market::{MarketClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub scheduler: SchedulerConfig,
    pub hub: HubSettings,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

/// Upstream market API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Ingestion scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minutes between passes; values below 1 are treated as 1
    pub interval_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 10,
        }
    }
}

/// Broadcast hub configuration as written in the file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HubSettings {
    pub queue_capacity: usize,
    pub send_timeout_ms: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            send_timeout_ms: 5_000,
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

/// Price store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_url: "sqlite://market_tracker.db".to_string(),
            max_connections: 5,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults; then apply the process
    /// environment
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("MARKET_API_KEY") {
            self.fetcher.api_key = key;
        }
        if let Some(url) = lookup("MARKET_API_BASE_URL") {
            self.fetcher.base_url = url;
        }
        if let Some(raw) = lookup("FETCH_INTERVAL_MINUTES") {
            match raw.trim().parse::<i64>() {
                Ok(minutes) => self.scheduler.interval_minutes = minutes,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid FETCH_INTERVAL_MINUTES"),
            }
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.database_url = url;
        }
        if let Some(raw) = lookup("PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid PORT"),
            }
        }
        self
    }

    /// Scheduler interval, at least one minute
    pub fn fetch_interval(&self) -> Duration {
        interval_from_minutes(self.scheduler.interval_minutes)
    }

    /// Client settings for the upstream API
    pub fn market_client_config(&self) -> MarketClientConfig {
        MarketClientConfig {
            base_url: self.fetcher.base_url.clone(),
            api_key: self.fetcher.api_key.clone(),
            timeout: Duration::from_secs(self.fetcher.timeout_secs.max(1)),
            user_agent: self.fetcher.user_agent.clone(),
        }
    }

    /// Runtime hub settings
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::default()
            .queue_capacity(self.hub.queue_capacity)
            .send_timeout(Duration::from_millis(self.hub.send_timeout_ms.max(1)))
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.fetcher.api_key.is_empty() {
            config.fetcher.api_key = "********".to_string();
        }
        config
    }
}
