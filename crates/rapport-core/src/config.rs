use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RapportError;

/// Top-level Rapport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rapport: GeneralConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Monitoring pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Bounded capacity of each session's message queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long an enqueue may block before surfacing backpressure.
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
    /// Connector poll cadence per (session × platform) task.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Budget for one analysis provider call before degrading.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    /// Sessions idle longer than this are stopped by the cleanup sweep.
    #[serde(default = "default_max_inactive_minutes")]
    pub max_inactive_minutes: i64,
    /// Cadence of the inactivity cleanup sweep.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
            max_inactive_minutes: default_max_inactive_minutes(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Analysis provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which provider to use: "http" or "rule-only".
    #[serde(default = "default_provider")]
    pub default: String,
    pub http: Option<HttpProviderConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            http: None,
        }
    }
}

/// OpenAI-compatible HTTP analysis provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider_model")]
    pub model: String,
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_provider_model(),
            base_url: default_provider_base_url(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Platform connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Platforms served by in-memory connectors (manual entry, demos).
    #[serde(default = "default_manual_platforms")]
    pub manual_platforms: Vec<String>,
    pub http: Option<HttpConnectorConfig>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            manual_platforms: default_manual_platforms(),
            http: None,
        }
    }
}

/// HTTP polling connector config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConnectorConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Platform name this connector serves.
    #[serde(default = "default_http_platform")]
    pub platform: String,
    /// Endpoint serving `GET {base_url}/messages?since=<cursor>`.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// HTTP API / dispatch transport config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token required on API requests. `None` = no auth.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
            api_key: None,
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Rapport".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_enqueue_timeout_ms() -> u64 {
    500
}
fn default_poll_interval_secs() -> u64 {
    5
}
fn default_provider_timeout_secs() -> u64 {
    10
}
fn default_max_inactive_minutes() -> i64 {
    60
}
fn default_cleanup_interval_secs() -> u64 {
    300
}
fn default_provider() -> String {
    "rule-only".to_string()
}
fn default_provider_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_provider_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_manual_platforms() -> Vec<String> {
    vec!["manual".to_string()]
}
fn default_http_platform() -> String {
    "http".to_string()
}
fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_true() -> bool {
    true
}

/// Load configuration from a TOML file, falling back to defaults when
/// the file does not exist.
pub fn load(path: &str) -> Result<Config, RapportError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        RapportError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| RapportError::InvalidConfig(format!("failed to parse config: {e}")))?;

    Ok(config)
}
