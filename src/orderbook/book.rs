//! Order book state management

use super::{PriceLevel, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Outcome counters of merging one batch into a side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Levels inserted or overwritten
    pub upserted: usize,
    /// Levels removed because their new size was non-positive
    pub removed: usize,
    /// Removals addressed at prices not present in the book
    pub missing: usize,
}

impl ApplyStats {
    /// Total levels processed
    pub fn total(&self) -> usize {
        self.upserted + self.removed + self.missing
    }
}

/// One side of the book: price -> size
///
/// Stored in ascending price order; `levels()` and friends present bids
/// best (highest) first and asks best (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Decimal, Decimal>,
}

impl SideBook {
    /// Create an empty side
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Which side this is
    pub fn side(&self) -> Side {
        self.side
    }

    /// Merge a batch of levels in input order.
    ///
    /// Non-positive sizes delete, anything else upserts. Prices not in the
    /// batch are left alone, so an empty batch is a no-op.
    pub fn apply(&mut self, levels: &[PriceLevel]) -> ApplyStats {
        let mut stats = ApplyStats::default();

        for level in levels {
            if level.is_removal() {
                if self.levels.remove(&level.price).is_some() {
                    stats.removed += 1;
                } else {
                    stats.missing += 1;
                }
            } else {
                self.levels.insert(level.price, level.size);
                stats.upserted += 1;
            }
        }

        stats
    }

    /// Size at `price`, if the level exists
    pub fn get(&self, price: Decimal) -> Option<Decimal> {
        self.levels.get(&price).copied()
    }

    /// Whether a level exists at `price`
    pub fn contains(&self, price: Decimal) -> bool {
        self.levels.contains_key(&price)
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the side has no levels
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Best level for this side
    pub fn best(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.iter().next_back(),
            Side::Ask => self.levels.iter().next(),
        };
        entry.map(|(price, size)| PriceLevel::new(*price, *size))
    }

    /// Iterate levels best to worst
    pub fn iter(&self) -> Box<dyn Iterator<Item = PriceLevel> + '_> {
        let levels = self
            .levels
            .iter()
            .map(|(price, size)| PriceLevel::new(*price, *size));
        match self.side {
            Side::Bid => Box::new(levels.rev()),
            Side::Ask => Box::new(levels),
        }
    }

    /// All levels, best to worst
    pub fn levels(&self) -> Vec<PriceLevel> {
        self.iter().collect()
    }

    /// Top `n` levels, best to worst
    pub fn top(&self, n: usize) -> Vec<PriceLevel> {
        self.iter().take(n).collect()
    }

    /// Sum of sizes across all levels
    pub fn total_size(&self) -> Decimal {
        self.levels.values().copied().sum()
    }

    /// Drop every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}

/// L2 aggregated order book for one market
#[derive(Debug, Clone)]
pub struct OrderBook {
    market: String,
    bids: SideBook,
    asks: SideBook,
    updated_at: Option<DateTime<Utc>>,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            bids: SideBook::new(Side::Bid),
            asks: SideBook::new(Side::Ask),
            updated_at: None,
        }
    }

    /// Market identifier
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Bid side
    pub fn bids(&self) -> &SideBook {
        &self.bids
    }

    /// Ask side
    pub fn asks(&self) -> &SideBook {
        &self.asks
    }

    /// Time the last batch was applied
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Apply one decoded batch to both sides independently.
    ///
    /// Returns the (bids, asks) merge counters.
    pub fn apply_batch(
        &mut self,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> (ApplyStats, ApplyStats) {
        let bid_stats = self.bids.apply(bids);
        let ask_stats = self.asks.apply(asks);
        self.updated_at = Some(Utc::now());
        (bid_stats, ask_stats)
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best().map(|l| l.price)
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best().map(|l| l.price)
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Get spread
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Whether both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Drop all levels on both sides
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.updated_at = None;
    }

    /// Copy the current state out for consumers
    pub fn snapshot(&self, sequence: Option<u64>) -> BookSnapshot {
        BookSnapshot {
            market: self.market.clone(),
            bids: self.bids.clone(),
            asks: self.asks.clone(),
            sequence,
            updated_at: self.updated_at,
        }
    }
}

/// Immutable view of a book after a fully applied batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSnapshot {
    /// Market identifier
    pub market: String,
    /// Bid side
    pub bids: SideBook,
    /// Ask side
    pub asks: SideBook,
    /// Last accepted sequence number, if the feed is sequenced
    pub sequence: Option<u64>,
    /// Time of the last applied batch
    pub updated_at: Option<DateTime<Utc>>,
}

impl BookSnapshot {
    /// Empty snapshot for a market
    pub fn empty(market: impl Into<String>) -> Self {
        OrderBook::new(market).snapshot(None)
    }

    /// Bids, highest price first
    pub fn bids_sorted(&self) -> Vec<PriceLevel> {
        self.bids.levels()
    }

    /// Asks, lowest price first
    pub fn asks_sorted(&self) -> Vec<PriceLevel> {
        self.asks.levels()
    }

    /// Top `n` bids
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids.top(n)
    }

    /// Top `n` asks
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks.top(n)
    }

    /// Whether both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
