//! CLI interface for orderbook-sync
//!
//! Provides subcommands for:
//! - `run`: Maintain the book from the live feed
//! - `replay`: Rebuild the book from a recorded JSON-lines feed
//! - `config`: Show the effective configuration

mod replay;
mod run;

pub use replay::ReplayArgs;
pub use run::RunArgs;

use crate::orderbook::BookSnapshot;
use clap::{Parser, Subcommand};
use std::fmt::Write;

#[derive(Parser, Debug)]
#[command(name = "orderbook-sync")]
#[command(about = "Maintain a local order book from an incremental delta feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Maintain the book from the live feed
    Run(RunArgs),
    /// Rebuild the book from a recorded feed
    Replay(ReplayArgs),
    /// Show the effective configuration
    Config,
}

/// Render the top `depth` levels of each side as a text ladder.
///
/// Asks are printed above bids, both nearest the spread in the middle.
pub fn render_book(snapshot: &BookSnapshot, depth: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (sequence {})",
        snapshot.market,
        snapshot
            .sequence
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(out, "{:>8} {:>16} {:>16}", "side", "price", "size");

    for level in snapshot.top_asks(depth).iter().rev() {
        let _ = writeln!(out, "{:>8} {:>16} {:>16}", "ask", level.price, level.size);
    }
    let _ = writeln!(out, "{:-<42}", "");
    for level in snapshot.top_bids(depth) {
        let _ = writeln!(out, "{:>8} {:>16} {:>16}", "bid", level.price, level.size);
    }

    out
}
