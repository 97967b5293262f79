//! Run command implementation

use super::render_book;
use crate::config::Config;
use crate::feed::{BookFeed, CentrifugeFeed};
use crate::orderbook::{BookReconciler, BookService};
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Levels per side to display (defaults to `book.depth`)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Milliseconds between book refreshes
    #[arg(long, default_value_t = 1000)]
    pub refresh_ms: u64,

    /// Log top of book only, without printing the ladder
    #[arg(short, long)]
    pub quiet: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let depth = self.depth.unwrap_or(config.book.depth);

        let feed = CentrifugeFeed::from_config(&config.feed);
        let events = feed.subscribe().await?;

        let reconciler = BookReconciler::new(config.market())
            .with_strict_sequencing(config.book.strict_sequencing);
        let (service, mut snapshots) = BookService::new(reconciler);

        let service = tokio::spawn(service.run_until(events, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }));

        let mut ticker = tokio::time::interval(Duration::from_millis(self.refresh_ms.max(1)));
        loop {
            ticker.tick().await;

            match snapshots.has_changed() {
                Ok(true) => {
                    let snapshot = snapshots.borrow_and_update().clone();
                    tracing::info!(
                        market = %snapshot.market,
                        sequence = ?snapshot.sequence,
                        best_bid = ?snapshot.bids.best().map(|l| l.price),
                        best_ask = ?snapshot.asks.best().map(|l| l.price),
                        bid_levels = snapshot.bids.len(),
                        ask_levels = snapshot.asks.len(),
                        "Book updated"
                    );
                    if !self.quiet {
                        print!("{}", render_book(&snapshot, depth));
                    }
                }
                Ok(false) => {}
                // Service stopped and dropped the sender
                Err(_) => break,
            }
        }

        let stats = service.await?;
        tracing::info!(
            applied = stats.applied,
            stale = stats.stale,
            resets = stats.resets,
            "Run finished"
        );

        Ok(())
    }
}
