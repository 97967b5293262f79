//! Order book module
//!
//! Incremental reconciliation of delta-only price level feeds:
//! - `decoder`: raw `(price, size)` text pairs into typed levels
//! - `book`: per-side price maps with upsert/delete-on-zero merge
//! - `sequence`: stale and replayed batch rejection
//! - `reconciler`: single ingress owning the book and the sequence cursor
//! - `service`: serialized event loop publishing snapshots

mod book;
mod decoder;
mod reconciler;
mod sequence;
mod service;

pub use book::{ApplyStats, BookSnapshot, OrderBook, SideBook};
pub use decoder::{decode_level, decode_levels, DecodeError, DecodedBatch, RawLevel};
pub use reconciler::{BookReconciler, IngestError, IngestReport};
pub use sequence::{SequenceError, SequenceGuard, SequenceState};
pub use service::{BookService, ServiceStats, SnapshotReceiver};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total size available (non-positive means "remove")
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Whether applying this level removes the price from its side
    pub fn is_removal(&self) -> bool {
        self.size <= Decimal::ZERO
    }
}

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side, best is highest price
    Bid,
    /// Sell side, best is lowest price
    Ask,
}

impl Side {
    /// Lowercase name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
