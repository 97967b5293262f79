//! Prometheus metrics
//!
//! Recorded through the `metrics` facade; calls are no-ops until an exporter
//! is installed.

use crate::orderbook::Side;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

const BATCHES_APPLIED: &str = "orderbook_sync_batches_applied_total";
const BATCHES_STALE: &str = "orderbook_sync_batches_stale_total";
const LEVELS_REJECTED: &str = "orderbook_sync_levels_rejected_total";
const RESETS: &str = "orderbook_sync_resets_total";
const BID_LEVELS: &str = "orderbook_sync_bid_levels";
const ASK_LEVELS: &str = "orderbook_sync_ask_levels";
const APPLY_LATENCY: &str = "orderbook_sync_apply_latency_seconds";

/// Install the Prometheus exporter on `0.0.0.0:port`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    describe_counter!(BATCHES_APPLIED, "Delta batches applied to the book");
    describe_counter!(BATCHES_STALE, "Delta batches dropped for a stale sequence");
    describe_counter!(LEVELS_REJECTED, "Malformed levels dropped while decoding");
    describe_counter!(RESETS, "Book resets after connection loss");
    describe_gauge!(BID_LEVELS, "Price levels on the bid side");
    describe_gauge!(ASK_LEVELS, "Price levels on the ask side");
    describe_histogram!(APPLY_LATENCY, "Time to decode and merge one batch");

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Count an applied batch and its processing time
pub fn record_batch_applied(market: &str, elapsed: Duration) {
    counter!(BATCHES_APPLIED, "market" => market.to_owned()).increment(1);
    histogram!(APPLY_LATENCY, "market" => market.to_owned()).record(elapsed.as_secs_f64());
}

/// Count a batch dropped for a stale sequence
pub fn record_stale_batch(market: &str) {
    counter!(BATCHES_STALE, "market" => market.to_owned()).increment(1);
}

/// Count malformed levels dropped from one side of a batch
pub fn record_rejected_levels(market: &str, side: Side, count: usize) {
    counter!(
        LEVELS_REJECTED,
        "market" => market.to_owned(),
        "side" => side.as_str()
    )
    .increment(count as u64);
}

/// Count a book reset
pub fn record_reset(market: &str) {
    counter!(RESETS, "market" => market.to_owned()).increment(1);
}

/// Publish current depth per side
pub fn set_book_depth(market: &str, bids: usize, asks: usize) {
    gauge!(BID_LEVELS, "market" => market.to_owned()).set(bids as f64);
    gauge!(ASK_LEVELS, "market" => market.to_owned()).set(asks as f64);
}
