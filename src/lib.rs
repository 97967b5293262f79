//! orderbook-sync: local limit order book maintained from a delta feed
//!
//! This library provides the core components for:
//! - Decoding incremental price-level batches
//! - Merging them into a sorted two-sided book
//! - Sequence checking and reset on reconnect
//! - A Centrifugo WebSocket feed with automatic reconnection
//! - Replay of recorded feeds
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod feed;
pub mod orderbook;
pub mod telemetry;
pub mod ws;
