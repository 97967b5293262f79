//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// Shortest ping period the client will run with
pub const MIN_PING_INTERVAL: Duration = Duration::from_millis(100);

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Maximum consecutive failed attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Delay between reconnection attempts
    pub reconnect_delay: Duration,
    /// Interval for sending ping frames; a ping left unanswered for one
    /// interval drops the connection
    pub ping_interval: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            reconnect_delay: Duration::from_secs(1),
            ping_interval: Duration::from_secs(25),
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set reconnection delay
    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.reconnect_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Ping period actually used, never shorter than `MIN_PING_INTERVAL`
    pub fn effective_ping_interval(&self) -> Duration {
        self.ping_interval.max(MIN_PING_INTERVAL)
    }
}

/// Messages and lifecycle notifications from the socket task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text frame
    Text(String),
    /// Connection established (first or after a reconnect)
    Connected,
    /// Connection gone for good
    Disconnected,
    /// Waiting to retry after a failure
    Reconnecting { attempt: u32 },
}

/// WebSocket errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WsError {
    /// Connection failed or dropped
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Maximum reconnection attempts exceeded
    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
}
