//! Delta feed module
//!
//! Transport side of the book: a Centrifugo channel delivering publications
//! of changed levels, plus connection and subscription lifecycle events.
//! Recorded feeds can be replayed from JSON-lines files.

mod centrifuge;
pub mod protocol;
mod replay;
mod types;

pub use centrifuge::{CentrifugeConfig, CentrifugeFeed, CentrifugeSession, SessionOutput};
pub use replay::{parse_events, parse_line, ReplayError, ReplayFeed};
pub use types::{ConnectionEvent, FeedEvent, Publication, SubscriptionEvent};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for delta feed implementations
#[async_trait]
pub trait BookFeed: Send + Sync {
    /// Start the feed and return its event stream
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<FeedEvent>>;
}
