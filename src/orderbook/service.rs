//! Serialized book maintenance loop
//!
//! Feed events arrive on an mpsc channel and are handled one at a time by the
//! owned `BookReconciler`. Complete snapshots are published on a watch channel.

use super::{BookReconciler, BookSnapshot};
use crate::feed::FeedEvent;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Read side handed to display consumers
pub type SnapshotReceiver = watch::Receiver<Arc<BookSnapshot>>;

/// Counters accumulated over a service run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    /// Publications applied
    pub applied: u64,
    /// Publications dropped for a stale sequence
    pub stale: u64,
    /// Individual levels dropped as malformed
    pub rejected_levels: u64,
    /// Book resets caused by connection or subscription loss
    pub resets: u64,
}

/// Owns the reconciler and publishes its snapshots
pub struct BookService {
    reconciler: BookReconciler,
    snapshot_tx: watch::Sender<Arc<BookSnapshot>>,
    stats: ServiceStats,
}

impl BookService {
    /// Create a service and the first snapshot receiver
    pub fn new(reconciler: BookReconciler) -> (Self, SnapshotReceiver) {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(reconciler.snapshot()));
        let service = Self {
            reconciler,
            snapshot_tx,
            stats: ServiceStats::default(),
        };
        (service, snapshot_rx)
    }

    /// Another receiver for the snapshot stream
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshot_tx.subscribe()
    }

    /// The reconciler being driven
    pub fn reconciler(&self) -> &BookReconciler {
        &self.reconciler
    }

    /// Counters so far
    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    /// Handle one event to completion.
    ///
    /// Returns true if a new snapshot was published.
    pub fn handle(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Publication(publication) => match self.reconciler.ingest(&publication) {
                Ok(report) => {
                    self.stats.applied += 1;
                    self.stats.rejected_levels += report.decode_errors.len() as u64;
                    self.publish();
                    true
                }
                Err(_) => {
                    self.stats.stale += 1;
                    false
                }
            },
            FeedEvent::Connection(event) => {
                if self.reconciler.on_connection(event) {
                    self.stats.resets += 1;
                    self.publish();
                    true
                } else {
                    false
                }
            }
            FeedEvent::Subscription(event) => {
                if self.reconciler.on_subscription(&event) {
                    self.stats.resets += 1;
                    self.publish();
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Consume events until the sender side is dropped
    pub async fn run(self, events: mpsc::Receiver<FeedEvent>) -> ServiceStats {
        self.run_until(events, std::future::pending()).await
    }

    /// Consume events until the channel closes or `shutdown` completes.
    ///
    /// An event already being handled always finishes before shutdown is
    /// observed.
    pub async fn run_until<F>(mut self, mut events: mpsc::Receiver<FeedEvent>, shutdown: F) -> ServiceStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let market = self.reconciler.book().market().to_string();

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            self.handle(event);
                        }
                        None => {
                            tracing::info!(market = %market, "Feed closed");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!(market = %market, "Book service shutting down");
                    break;
                }
            }
        }

        tracing::info!(
            market = %market,
            applied = self.stats.applied,
            stale = self.stats.stale,
            rejected_levels = self.stats.rejected_levels,
            resets = self.stats.resets,
            "Book service stopped"
        );

        self.stats
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(Arc::new(self.reconciler.snapshot()));
    }
}
