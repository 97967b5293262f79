//! End-to-end integration tests

use orderbook_sync::cli::render_book;
use orderbook_sync::config::Config;
use orderbook_sync::feed::{BookFeed, ReplayFeed};
use orderbook_sync::orderbook::{BookReconciler, BookService, BookSnapshot, ServiceStats};
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::Arc;

#[test]
fn test_config_example_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();
    assert_eq!(config.feed.channel, "orderbook:BTC-USD");
    assert_eq!(config.market(), "BTC-USD");
    assert!(config.book.strict_sequencing);
    assert!(config.feed.token.is_none());
}

const RECORDED: &str = r#"{"connection":"connected"}
{"subscription":"subscribed"}
{"bids":[["100.5","2.0"],["101.0","1.0"]],"asks":[["102.5","1"]],"sequence":1}
{"bids":[["100.5","0"],["102.0","3.0"]],"asks":[],"sequence":2}

{"bids":[["1","1"]],"sequence":2}
not json at all
{"bids":[["oops","1"]],"asks":[["103","2"]],"sequence":3}
"#;

async fn replay(content: &str, strict: bool) -> (ServiceStats, Arc<BookSnapshot>) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();

    let events = ReplayFeed::new(file.path()).subscribe().await.unwrap();
    let reconciler = BookReconciler::new("BTC-USD").with_strict_sequencing(strict);
    let (service, snapshots) = BookService::new(reconciler);
    let stats = service.run(events).await;

    let snapshot = snapshots.borrow().clone();
    (stats, snapshot)
}

#[tokio::test]
async fn test_replay_recorded_feed() {
    let (stats, snapshot) = replay(RECORDED, true).await;

    assert_eq!(stats.applied, 3);
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.rejected_levels, 1);
    assert_eq!(stats.resets, 0);

    assert_eq!(snapshot.sequence, Some(3));
    assert_eq!(snapshot.bids.len(), 2);
    assert_eq!(snapshot.bids.get(dec!(101)), Some(dec!(1)));
    assert_eq!(snapshot.bids.get(dec!(102)), Some(dec!(3)));
    assert_eq!(snapshot.asks.best().map(|l| l.price), Some(dec!(102.5)));
    assert_eq!(snapshot.asks.len(), 2);

    let text = render_book(&snapshot, 5);
    assert!(text.starts_with("BTC-USD (sequence 3)"));
}

#[tokio::test]
async fn test_replay_without_strict_sequencing() {
    let (stats, snapshot) = replay(RECORDED, false).await;

    assert_eq!(stats.applied, 4);
    assert_eq!(stats.stale, 0);
    assert_eq!(snapshot.bids.get(dec!(1)), Some(dec!(1)));
}

#[tokio::test]
async fn test_replay_reconnect_clears_book() {
    let content = r#"{"bids":[["100","1"]],"sequence":9}
{"connection":"reconnected"}
"#;
    let (stats, snapshot) = replay(content, true).await;

    assert_eq!(stats.resets, 1);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.sequence, None);
}
