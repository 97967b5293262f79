//! Single ingress for one market's book
//!
//! Owns the held `OrderBook` and its `SequenceGuard`. Every feed event for the
//! market goes through here, one at a time, so callers never see a batch half
//! applied.

use super::{
    decode_levels, ApplyStats, BookSnapshot, DecodeError, OrderBook, SequenceError,
    SequenceGuard, Side,
};
use crate::feed::{ConnectionEvent, Publication, SubscriptionEvent};
use crate::telemetry;
use std::time::Instant;
use thiserror::Error;

/// Reasons a whole publication was not applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Sequence number not newer than the last accepted one
    #[error(transparent)]
    StaleSequence(#[from] SequenceError),
}

/// What happened to an accepted publication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Sequence number the batch carried
    pub sequence: Option<u64>,
    /// Bid side merge counters
    pub bids: ApplyStats,
    /// Ask side merge counters
    pub asks: ApplyStats,
    /// Tuples dropped during decoding
    pub decode_errors: Vec<(Side, DecodeError)>,
}

/// Reconciles a delta feed into an order book
#[derive(Debug, Clone)]
pub struct BookReconciler {
    book: OrderBook,
    guard: SequenceGuard,
    strict_sequencing: bool,
}

impl BookReconciler {
    /// Create a reconciler with an empty book and strict sequencing
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            book: OrderBook::new(market),
            guard: SequenceGuard::new(),
            strict_sequencing: true,
        }
    }

    /// Enable or disable sequence checks.
    ///
    /// When disabled, sequence numbers are ignored and every batch applies.
    pub fn with_strict_sequencing(mut self, strict: bool) -> Self {
        self.strict_sequencing = strict;
        self
    }

    /// Current book
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Last accepted sequence number
    pub fn sequence(&self) -> Option<u64> {
        self.guard.last()
    }

    /// Snapshot of the current book
    pub fn snapshot(&self) -> BookSnapshot {
        self.book.snapshot(self.guard.last())
    }

    /// Apply one publication.
    ///
    /// A stale sequence drops the whole batch and leaves the book unchanged.
    /// Malformed tuples are dropped individually and returned in the report;
    /// the rest of the batch still applies.
    pub fn ingest(&mut self, publication: &Publication) -> Result<IngestReport, IngestError> {
        let market = self.book.market().to_string();
        let started = Instant::now();

        if self.strict_sequencing {
            if let Some(sequence) = publication.sequence {
                if let Err(e) = self.guard.check(sequence) {
                    tracing::warn!(
                        market = %market,
                        error = %e,
                        "Dropping stale batch"
                    );
                    telemetry::record_stale_batch(&market);
                    return Err(e.into());
                }
            }
        }

        let bids = decode_levels(&publication.bids);
        let asks = decode_levels(&publication.asks);

        let mut decode_errors = Vec::with_capacity(bids.errors.len() + asks.errors.len());
        for (side, errors) in [(Side::Bid, bids.errors), (Side::Ask, asks.errors)] {
            if errors.is_empty() {
                continue;
            }
            telemetry::record_rejected_levels(&market, side, errors.len());
            for e in errors {
                tracing::warn!(
                    market = %market,
                    side = %side,
                    index = e.index,
                    price = %e.price,
                    size = %e.size,
                    reason = %e.reason,
                    "Dropping malformed level"
                );
                decode_errors.push((side, e));
            }
        }

        let (bid_stats, ask_stats) = self.book.apply_batch(&bids.levels, &asks.levels);

        telemetry::record_batch_applied(&market, started.elapsed());
        telemetry::set_book_depth(&market, self.book.bids().len(), self.book.asks().len());

        tracing::trace!(
            market = %market,
            sequence = ?publication.sequence,
            bid_upserts = bid_stats.upserted,
            bid_removals = bid_stats.removed,
            ask_upserts = ask_stats.upserted,
            ask_removals = ask_stats.removed,
            "Applied batch"
        );

        Ok(IngestReport {
            sequence: publication.sequence,
            bids: bid_stats,
            asks: ask_stats,
            decode_errors,
        })
    }

    /// React to a transport state change.
    ///
    /// Returns true if accumulated state was discarded.
    pub fn on_connection(&mut self, event: ConnectionEvent) -> bool {
        let market = self.book.market().to_string();
        match event {
            ConnectionEvent::Connecting => {
                tracing::debug!(market = %market, "Feed connecting");
            }
            ConnectionEvent::Connected => {
                tracing::info!(market = %market, "Feed connected");
            }
            ConnectionEvent::Reconnecting { attempt } => {
                tracing::info!(market = %market, attempt, "Feed reconnecting");
            }
            ConnectionEvent::Rejected { code } => {
                tracing::error!(market = %market, code, "Feed connection rejected");
            }
            ConnectionEvent::Disconnected | ConnectionEvent::Reconnected => {
                tracing::info!(market = %market, event = ?event, "Feed interrupted, discarding book");
            }
        }

        if event.invalidates_book() {
            self.reset();
            true
        } else {
            false
        }
    }

    /// React to a subscription state change.
    ///
    /// Losing the subscription discards the book, as publications missed
    /// until the next subscribe cannot be recovered. Returns true if state
    /// was discarded.
    pub fn on_subscription(&mut self, event: &SubscriptionEvent) -> bool {
        let market = self.book.market().to_string();
        match event {
            SubscriptionEvent::Subscribing => {
                tracing::debug!(market = %market, "Subscribing");
            }
            SubscriptionEvent::Subscribed => {
                tracing::info!(market = %market, "Subscribed");
            }
            SubscriptionEvent::Unsubscribed { code, reason } => {
                tracing::info!(market = %market, code, reason = %reason, "Unsubscribed, discarding book");
            }
            SubscriptionEvent::Error { code, message } => {
                tracing::warn!(market = %market, code, message = %message, "Subscription error");
            }
        }

        if event.invalidates_book() {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Drop both sides and the sequence cursor
    pub fn reset(&mut self) {
        self.book.clear();
        self.guard.reset();
        telemetry::record_reset(self.book.market());
        telemetry::set_book_depth(self.book.market(), 0, 0);
    }
}
