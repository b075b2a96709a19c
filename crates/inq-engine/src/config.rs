//! Configuration for the engine, API and sync worker

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

// Main config structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InquisitorConfig {
    pub elasticsearch: ElasticConfig,
    pub clickhouse: ClickHouseConfig,
    pub server: ServerConfig,
    pub thresholds: Thresholds,
    pub sync: SyncConfig,
}

// SIEM connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,

    // transport timeout, the engine itself never times out a call
    pub timeout_seconds: u64,

    // index holding authentication / raw logs
    pub logs_index: String,

    // index holding security detections
    pub security_index: String,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_seconds: 10,
            logs_index: "logs-*".to_string(),
            security_index: "security-*".to_string(),
        }
    }
}

// Fallback threat store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "inquisitor".to_string(),
            user: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: "0.0.0.0:5000".to_string() }
    }
}

/// Cut-offs used for recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    // suggest blocking when the top IP has more failed logins than this
    pub block_attempts: u64,

    // flag an IP when it has more events than this
    pub unusual_activity_events: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            block_attempts: 10,
            unusual_activity_events: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    pub window_hours: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            window_hours: 1,
        }
    }
}

impl InquisitorConfig {
    /// Apply environment overrides on top of file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("ELASTICSEARCH_NODE") {
            self.elasticsearch.url = url;
        }
        if let Ok(user) = std::env::var("ELASTICSEARCH_USERNAME") {
            self.elasticsearch.username = Some(user);
        }
        if let Ok(password) = std::env::var("ELASTICSEARCH_PASSWORD") {
            self.elasticsearch.password = Some(password);
        }
        if let Ok(url) = std::env::var("CLICKHOUSE_URL") {
            self.clickhouse.url = url;
        }
        if let Ok(addr) = std::env::var("INQ_BIND_ADDR") {
            self.server.addr = addr;
        }
        self
    }
}

// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<InquisitorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: InquisitorConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load from `INQ_CONFIG` (default `config/inquisitor.toml`), defaults when the file is missing
pub fn load_from_env() -> Result<InquisitorConfig, ConfigError> {
    let path = std::env::var("INQ_CONFIG").unwrap_or_else(|_| "config/inquisitor.toml".to_string());

    let config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        tracing::warn!(path = %path, "Config file not found, using defaults");
        InquisitorConfig::default()
    };

    Ok(config.with_env_overrides())
}
