//! Book service driven over channels, as the binary runs it

use orderbook_sync::feed::{ConnectionEvent, FeedEvent, Publication, SubscriptionEvent};
use orderbook_sync::orderbook::{BookReconciler, BookService};
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

fn publication(bids: &[(&str, &str)], asks: &[(&str, &str)], sequence: u64) -> FeedEvent {
    FeedEvent::Publication(Publication::new(bids, asks).with_sequence(sequence))
}

#[tokio::test]
async fn test_snapshots_follow_the_feed() {
    let (service, mut snapshots) = BookService::new(BookReconciler::new("BTC-USD"));
    let (tx, events) = mpsc::channel(16);
    let handle = tokio::spawn(service.run(events));

    assert!(snapshots.borrow().is_empty());

    tx.send(publication(&[("100", "1")], &[("101", "2")], 1))
        .await
        .unwrap();
    snapshots.changed().await.unwrap();
    {
        let snapshot = snapshots.borrow_and_update();
        assert_eq!(snapshot.bids.best().map(|l| l.price), Some(dec!(100)));
        assert_eq!(snapshot.asks.best().map(|l| l.price), Some(dec!(101)));
        assert_eq!(snapshot.sequence, Some(1));
    }

    drop(tx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.applied, 1);
}

#[tokio::test]
async fn test_reconnect_mid_stream() {
    let (service, snapshots) = BookService::new(BookReconciler::new("BTC-USD"));
    let (tx, events) = mpsc::channel(16);

    let feed = vec![
        FeedEvent::Connection(ConnectionEvent::Connecting),
        FeedEvent::Connection(ConnectionEvent::Connected),
        FeedEvent::Subscription(SubscriptionEvent::Subscribed),
        publication(&[("100", "1"), ("99", "1")], &[("101", "1")], 10),
        publication(&[("98", "1")], &[], 11),
        FeedEvent::Connection(ConnectionEvent::Disconnected),
        FeedEvent::Connection(ConnectionEvent::Reconnecting { attempt: 1 }),
        FeedEvent::Connection(ConnectionEvent::Reconnected),
        FeedEvent::Subscription(SubscriptionEvent::Subscribed),
        publication(&[("97", "2")], &[("103", "1")], 2),
    ];
    for event in feed {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    let stats = service.run(events).await;

    assert_eq!(stats.applied, 3);
    assert_eq!(stats.stale, 0);
    assert_eq!(stats.resets, 2);

    let snapshot = snapshots.borrow();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids.get(dec!(97)), Some(dec!(2)));
    assert_eq!(snapshot.asks.len(), 1);
    assert_eq!(snapshot.sequence, Some(2));
}

#[test]
fn test_stale_batches_are_counted_not_published() {
    let (mut service, mut snapshots) = BookService::new(BookReconciler::new("BTC-USD"));

    assert!(service.handle(publication(&[("100", "1")], &[], 5)));
    let _ = snapshots.borrow_and_update();

    assert!(!service.handle(publication(&[("100", "0")], &[], 5)));
    assert!(!snapshots.has_changed().unwrap());
    assert_eq!(service.stats().stale, 1);
    assert_eq!(service.reconciler().book().best_bid(), Some(dec!(100)));
}

#[test]
fn test_every_subscriber_sees_the_same_snapshot() {
    let (mut service, first) = BookService::new(BookReconciler::new("BTC-USD"));
    let second = service.subscribe();

    service.handle(publication(&[("100", "1")], &[], 1));

    assert_eq!(*first.borrow(), *second.borrow());
}

#[tokio::test]
async fn test_shutdown_stops_service() {
    let (service, _snapshots) = BookService::new(BookReconciler::new("BTC-USD"));
    let (tx, events) = mpsc::channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(service.run_until(events, async {
        let _ = stop_rx.await;
    }));

    tx.send(publication(&[("100", "1")], &[], 1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.applied, 1);
    drop(tx);
}

#[tokio::test]
async fn test_server_resubscribe_rebuilds_book() {
    let (service, snapshots) = BookService::new(BookReconciler::new("BTC-USD"));
    let (tx, events) = mpsc::channel(16);

    let feed = vec![
        FeedEvent::Subscription(SubscriptionEvent::Subscribed),
        publication(&[("100", "1"), ("99", "1")], &[("101", "1")], 40),
        FeedEvent::Subscription(SubscriptionEvent::Unsubscribed {
            code: 2500,
            reason: "insufficient state".to_string(),
        }),
        FeedEvent::Subscription(SubscriptionEvent::Subscribing),
        FeedEvent::Subscription(SubscriptionEvent::Subscribed),
        publication(&[("98", "3")], &[], 1),
    ];
    for event in feed {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    let stats = service.run(events).await;

    assert_eq!(stats.resets, 1);
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.stale, 0);

    let snapshot = snapshots.borrow();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids.get(dec!(98)), Some(dec!(3)));
    assert!(snapshot.asks.is_empty());
    assert_eq!(snapshot.sequence, Some(1));
}
