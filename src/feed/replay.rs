//! Event replay from JSON-lines files
//!
//! Each non-blank line is one feed event:
//! - `{"bids": [...], "asks": [...], "sequence": 5}`: a publication
//! - `{"connection": "reconnected"}`: a connection state change
//! - `{"subscription": "subscribed"}`: a subscription state change

use super::{BookFeed, ConnectionEvent, FeedEvent, Publication, SubscriptionEvent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

/// A line that could not be turned into an event
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Not valid JSON or wrong shape for its kind
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    /// Valid JSON that is not a known record kind
    #[error("line {line}: unrecognized record")]
    Unrecognized { line: usize },
}

/// Parse one line (1-based `line` for error reporting).
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_line(line: usize, text: &str) -> Result<Option<FeedEvent>, ReplayError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let json_err = |source| ReplayError::Json { line, source };
    let value: serde_json::Value = serde_json::from_str(text).map_err(json_err)?;
    let Some(object) = value.as_object() else {
        return Err(ReplayError::Unrecognized { line });
    };

    if let Some(event) = object.get("connection") {
        let event: ConnectionEvent = serde_json::from_value(event.clone()).map_err(json_err)?;
        return Ok(Some(FeedEvent::Connection(event)));
    }

    if let Some(event) = object.get("subscription") {
        let event: SubscriptionEvent = serde_json::from_value(event.clone()).map_err(json_err)?;
        return Ok(Some(FeedEvent::Subscription(event)));
    }

    if ["bids", "asks", "sequence"]
        .iter()
        .any(|key| object.contains_key(*key))
    {
        let publication: Publication = serde_json::from_value(value).map_err(json_err)?;
        return Ok(Some(FeedEvent::Publication(publication)));
    }

    Err(ReplayError::Unrecognized { line })
}

/// Parse a whole file body, skipping and logging bad lines
pub fn parse_events(content: &str) -> Vec<FeedEvent> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, text)| match parse_line(i + 1, text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping replay record");
                None
            }
        })
        .collect()
}

/// Feed that replays a recorded JSON-lines file
pub struct ReplayFeed {
    path: PathBuf,
}

impl ReplayFeed {
    /// Create a replay feed for `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl BookFeed for ReplayFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<FeedEvent>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", self.path.display(), e))?;
        let events = parse_events(&content);

        tracing::info!(
            path = %self.path.display(),
            events = events.len(),
            "Replaying recorded feed"
        );

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    tracing::debug!("Replay receiver dropped");
                    break;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publication_line() {
        let event = parse_line(1, r#"{"bids":[["1","2"]],"sequence":4}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            FeedEvent::Publication(Publication::new(&[("1", "2")], &[]).with_sequence(4))
        );
    }

    #[test]
    fn test_parse_connection_line() {
        let event = parse_line(1, r#"{"connection":"reconnected"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, FeedEvent::Connection(ConnectionEvent::Reconnected));
    }

    #[test]
    fn test_parse_subscription_line() {
        let event = parse_line(1, r#"{"subscription":{"error":{"code":1,"message":"x"}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            FeedEvent::Subscription(SubscriptionEvent::Error {
                code: 1,
                message: "x".to_string()
            })
        );
    }

    #[test]
    fn test_parse_blank_line() {
        assert!(parse_line(1, "   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_unrecognized() {
        assert!(matches!(
            parse_line(7, r#"{"foo":1}"#),
            Err(ReplayError::Unrecognized { line: 7 })
        ));
        assert!(matches!(
            parse_line(8, "[1,2]"),
            Err(ReplayError::Unrecognized { line: 8 })
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_line(3, "{nope").unwrap_err();
        assert!(err.to_string().starts_with("line 3:"));
    }

    #[test]
    fn test_parse_events_skips_bad_lines() {
        let content = "{\"bids\":[[\"1\",\"1\"]]}\n\ngarbage\n{\"connection\":\"disconnected\"}\n";
        let events = parse_events(content);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            FeedEvent::Connection(ConnectionEvent::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_replay_missing_file() {
        let feed = ReplayFeed::new("/nonexistent/feed.jsonl");
        assert!(feed.subscribe().await.is_err());
    }
}
