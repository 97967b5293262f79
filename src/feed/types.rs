//! Feed event types

use crate::orderbook::RawLevel;
use serde::{Deserialize, Deserializer, Serialize};

/// A delta batch as published on the market channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Changed bid levels as `[price, size]` text pairs
    #[serde(default, deserialize_with = "lenient_levels")]
    pub bids: Vec<RawLevel>,
    /// Changed ask levels as `[price, size]` text pairs
    #[serde(default, deserialize_with = "lenient_levels")]
    pub asks: Vec<RawLevel>,
    /// Position of this batch in the feed, when the feed is sequenced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl Publication {
    /// Build a publication from `&str` pairs
    pub fn new(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> Self {
        let owned = |levels: &[(&str, &str)]| {
            levels
                .iter()
                .map(|(p, s)| (p.to_string(), s.to_string()))
                .collect()
        };
        Self {
            bids: owned(bids),
            asks: owned(asks),
            sequence: None,
        }
    }

    /// Tag with a sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Whether the batch carries no levels on either side
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Accept any JSON shape per entry so one bad tuple cannot sink the batch.
///
/// Numbers are taken as their literal text; anything else is kept as raw
/// JSON text and rejected later by the decoder with its index.
fn lenient_levels<'de, D>(deserializer: D) -> Result<Vec<RawLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries.into_iter().map(raw_level_from_value).collect())
}

fn raw_level_from_value(value: serde_json::Value) -> RawLevel {
    fn text(v: &serde_json::Value) -> String {
        match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }

    match value {
        serde_json::Value::Array(items) if items.len() == 2 => (text(&items[0]), text(&items[1])),
        other => (other.to_string(), String::new()),
    }
}

/// Transport connection state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// Dialing the server
    Connecting,
    /// First successful connection
    Connected,
    /// Connection lost or closed
    Disconnected,
    /// Waiting before the next attempt
    Reconnecting { attempt: u32 },
    /// Connection restored after a loss
    Reconnected,
    /// Server refused the connect command; the feed stops
    Rejected { code: u32 },
}

impl ConnectionEvent {
    /// Whether previously accumulated deltas can no longer be trusted
    pub fn invalidates_book(&self) -> bool {
        matches!(self, ConnectionEvent::Disconnected | ConnectionEvent::Reconnected)
    }
}

/// Channel subscription state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEvent {
    /// Subscribe request sent
    Subscribing,
    /// Server confirmed the subscription
    Subscribed,
    /// Server or client ended the subscription
    Unsubscribed { code: u32, reason: String },
    /// Subscription failed
    Error { code: u32, message: String },
}

impl SubscriptionEvent {
    /// Whether previously accumulated deltas can no longer be trusted
    pub fn invalidates_book(&self) -> bool {
        matches!(self, SubscriptionEvent::Unsubscribed { .. })
    }
}

/// Everything a feed delivers to the book service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Connection state change
    Connection(ConnectionEvent),
    /// Subscription state change
    Subscription(SubscriptionEvent),
    /// Delta batch
    Publication(Publication),
}
