//! Keiba crawler
//!
//! Incremental collector of race results from db.netkeiba.com into SQLite or CSV.

mod cli;
mod config;
mod crawler;
mod error;
mod normalize;
mod race_id;
mod retry;
mod scraper;
mod storage;
#[cfg(test)]
mod test_support;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::crawler::CancelFlag;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keiba_crawler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            range,
            store,
            interval,
        } => {
            let cancel = CancelFlag::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Ctrl-C received, stopping after the current race");
                    on_signal.cancel();
                }
            });
            cli::run_crawl(range, store, interval, cancel).await
        }
        Commands::Plan { range, store } => cli::run_plan(range, store),
        Commands::Show {
            race_id,
            db,
            config,
            format,
        } => cli::run_show(race_id, db, config, format),
    }
}
