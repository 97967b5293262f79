//! Configuration types for orderbook-sync

use serde::{Deserialize, Serialize};

/// Environment variable overriding `feed.url`
pub const ENV_URL: &str = "ORDERBOOK_SYNC_URL";
/// Environment variable overriding `feed.token`
pub const ENV_TOKEN: &str = "ORDERBOOK_SYNC_TOKEN";
/// Environment variable overriding `feed.channel`
pub const ENV_CHANNEL: &str = "ORDERBOOK_SYNC_CHANNEL";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub book: BookConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Delta feed connection configuration
///
/// Passed through to the transport untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Centrifugo WebSocket endpoint
    pub url: String,
    /// Connection token
    #[serde(default)]
    pub token: Option<String>,
    /// Market channel, e.g. "orderbook:BTC-USD"
    pub channel: String,
    /// Delay between reconnection attempts (milliseconds)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Consecutive failed attempts before giving up (0 = never)
    #[serde(default)]
    pub max_reconnects: u32,
    /// WebSocket ping interval (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}
fn default_ping_interval_secs() -> u64 {
    25
}

/// Book maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    /// Reject batches whose sequence is not newer than the last accepted one
    #[serde(default = "default_true")]
    pub strict_sequencing: bool,

    /// Levels per side shown by the CLI
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_true() -> bool {
    true
}
fn default_depth() -> usize {
    10
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            strict_sequencing: true,
            depth: 10,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Port for the Prometheus exporter; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the feed cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.feed.ping_interval_secs == 0 {
            anyhow::bail!("feed.ping_interval_secs must be at least 1");
        }
        Ok(())
    }

    /// Override feed settings from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override feed settings from `lookup`; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_URL) {
            self.feed.url = url;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.feed.token = Some(token);
        }
        if let Some(channel) = get(ENV_CHANNEL) {
            self.feed.channel = channel;
        }
    }

    /// Market identifier derived from the channel ("orderbook:BTC-USD" -> "BTC-USD")
    pub fn market(&self) -> &str {
        self.feed
            .channel
            .rsplit_once(':')
            .map(|(_, market)| market)
            .unwrap_or(&self.feed.channel)
    }
}
