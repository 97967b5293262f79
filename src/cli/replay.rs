//! Replay command implementation

use super::render_book;
use crate::config::Config;
use crate::feed::{BookFeed, ReplayFeed};
use crate::orderbook::{BookReconciler, BookService};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file of recorded feed events
    pub file: PathBuf,

    /// Levels per side to display (defaults to `book.depth`)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Market name shown for the book (defaults to the configured channel's market)
    #[arg(short, long)]
    pub market: Option<String>,
}

impl ReplayArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let depth = self.depth.unwrap_or(config.book.depth);
        let market = self
            .market
            .clone()
            .unwrap_or_else(|| config.market().to_string());

        let events = ReplayFeed::new(&self.file).subscribe().await?;

        let reconciler =
            BookReconciler::new(market).with_strict_sequencing(config.book.strict_sequencing);
        let (service, snapshots) = BookService::new(reconciler);
        let stats = service.run(events).await;

        let snapshot = snapshots.borrow().clone();
        print!("{}", render_book(&snapshot, depth));
        println!(
            "applied={} stale={} rejected_levels={} resets={}",
            stats.applied, stats.stale, stats.rejected_levels, stats.resets
        );

        Ok(())
    }
}
