//! CLI commands for keiba-crawler.
//!
//! Supports crawling a year range, a dry-run plan of what would be fetched,
//! and printing a stored race.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::{AppConfig, Backend};
use crate::crawler::{CancelFlag, CrawlSettings, CrawlSummary, Crawler, StopReason};
use crate::normalize::seconds_to_text;
use crate::race_id::{self, RaceId};
use crate::scraper::HttpFetcher;
use crate::storage::{CsvRepository, RaceRepository, RaceStore};
use crate::types::{BetCategory, EntrantResult, RaceInfo};

#[derive(Parser)]
#[command(name = "keiba-crawler")]
#[command(version, about = "Keiba crawler: incremental race result collection from db.netkeiba.com", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl every race in a year range that is not stored yet
    Crawl {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Minimum seconds between requests
        #[arg(short, long)]
        interval: Option<f64>,
    },

    /// Show how many races a crawl would fetch, without fetching
    Plan {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print a stored race from the SQLite database
    Show {
        /// 12-digit race ID, e.g. 202406050811
        #[arg(value_name = "RACE_ID")]
        race_id: RaceId,

        /// Database path override
        #[arg(long)]
        db: Option<PathBuf>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Year range, inclusive
#[derive(Args)]
pub struct RangeArgs {
    /// First year to crawl
    #[arg(short, long)]
    pub start_year: Option<u16>,

    /// Last year to crawl
    #[arg(short, long)]
    pub end_year: Option<u16>,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Storage backend and paths
#[derive(Args)]
pub struct StoreArgs {
    /// Storage backend
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// SQLite database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// CSV race info path
    #[arg(long)]
    pub csv_info: Option<PathBuf>,

    /// CSV entrant data path
    #[arg(long)]
    pub csv_data: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Load configuration and apply CLI overrides
fn load_config(range: &RangeArgs, store: &StoreArgs) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(range.config.as_deref())?;

    if let Some(y) = range.start_year {
        config.crawl.start_year = y;
    }
    if let Some(y) = range.end_year {
        config.crawl.end_year = y;
    }
    if let Some(b) = store.backend {
        config.storage.backend = b;
    }
    if let Some(p) = &store.db {
        config.storage.db_path = p.clone();
    }
    if let Some(p) = &store.csv_info {
        config.storage.csv_info_path = p.clone();
    }
    if let Some(p) = &store.csv_data {
        config.storage.csv_data_path = p.clone();
    }

    Ok(config)
}

fn open_sqlite(config: &AppConfig) -> anyhow::Result<RaceRepository> {
    RaceRepository::new(&config.storage.db_path)
        .with_context(|| format!("Failed to open {}", config.storage.db_path.display()))
}

fn open_csv(config: &AppConfig) -> anyhow::Result<CsvRepository> {
    CsvRepository::open(&config.storage.csv_info_path, &config.storage.csv_data_path)
}

/// Run a crawl over the configured year range.
pub async fn run_crawl(
    range: RangeArgs,
    store: StoreArgs,
    interval: Option<f64>,
    cancel: CancelFlag,
) -> anyhow::Result<()> {
    let mut config = load_config(&range, &store)?;
    if let Some(secs) = interval {
        config.crawl.interval_secs = secs;
    }
    config.validate()?;

    info!(
        "Crawling {}-{} into {:?} storage, interval {}s",
        config.crawl.start_year,
        config.crawl.end_year,
        config.storage.backend,
        config.crawl.interval_secs
    );

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let summary = match config.storage.backend {
        Backend::Sqlite => {
            let repo = open_sqlite(&config)?;
            let mut crawler = crawl_with(fetcher, repo, &config, cancel);
            let summary = run_range(&mut crawler, &config).await?;
            info!("{} races stored", crawler.store().race_count()?);
            summary
        }
        Backend::Csv => {
            let repo = open_csv(&config)?;
            let mut crawler = crawl_with(fetcher, repo, &config, cancel);
            let summary = run_range(&mut crawler, &config).await?;
            info!("{} races stored", crawler.store().len());
            summary
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.stop_reason == StopReason::StorageUnavailable {
        bail!("crawl stopped: storage unavailable");
    }
    Ok(())
}

fn crawl_with<S: RaceStore>(
    fetcher: HttpFetcher,
    store: S,
    config: &AppConfig,
    cancel: CancelFlag,
) -> Crawler<HttpFetcher, S> {
    Crawler::new(fetcher, store, CrawlSettings::from_config(&config.crawl)).with_cancel_flag(cancel)
}

async fn run_range<S: RaceStore>(
    crawler: &mut Crawler<HttpFetcher, S>,
    config: &AppConfig,
) -> anyhow::Result<CrawlSummary> {
    Ok(crawler
        .run(config.crawl.start_year, config.crawl.end_year)
        .await?)
}

/// Candidate set for a crawl, computed without fetching
#[derive(Debug, Serialize)]
struct PlanReport {
    start_year: u16,
    end_year: u16,
    stored: usize,
    candidates: usize,
    first: Option<RaceId>,
    last: Option<RaceId>,
}

/// Print the candidate set a crawl would work through.
pub fn run_plan(range: RangeArgs, store: StoreArgs) -> anyhow::Result<()> {
    let config = load_config(&range, &store)?;
    config.validate()?;
    let (start, end) = (config.crawl.start_year, config.crawl.end_year);

    let existing = match config.storage.backend {
        Backend::Sqlite => open_sqlite(&config)?.existing(start, end)?,
        Backend::Csv => open_csv(&config)?.existing(start, end)?,
    };
    let candidates = race_id::plan(start, end, &existing)?;

    let report = PlanReport {
        start_year: start,
        end_year: end,
        stored: existing.len(),
        candidates: candidates.len(),
        first: candidates.first().copied(),
        last: candidates.last().copied(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct StoredRace<'a> {
    info: &'a RaceInfo,
    entries: &'a [EntrantResult],
}

/// Print one stored race.
pub fn run_show(
    race_id: RaceId,
    db: Option<PathBuf>,
    config_path: Option<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    if let Some(p) = db {
        config.storage.db_path = p;
    }

    let repo = open_sqlite(&config)?;
    let Some((info, entries)) = repo.load_race(&race_id)? else {
        bail!("race {} is not stored in {}", race_id, config.storage.db_path.display());
    };

    match format {
        OutputFormat::Json => {
            let race = StoredRace {
                info: &info,
                entries: &entries,
            };
            println!("{}", serde_json::to_string_pretty(&race)?);
        }
        OutputFormat::Table => print_table(&info, &entries),
    }
    Ok(())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Print a race in table format.
fn print_table(info: &RaceInfo, entries: &[EntrantResult]) {
    println!(
        "{} {}回{}{}日目 {}R {}",
        info.date,
        info.race_id.meeting(),
        info.venue,
        info.race_id.day(),
        info.race_number,
        info.race_name
    );
    println!(
        "{} {} {}m / {} / {}",
        info.surface.as_str(),
        info.direction.as_str(),
        info.distance,
        info.weather,
        info.condition
    );
    println!();

    println!(
        "{:>3} {:>2} {:>3}  {:<18} {:>6} {:>5} {:>4} {:>8} {:>6}",
        "着", "枠", "馬", "馬名", "タイム", "単勝", "人気", "馬体重", "複勝"
    );
    for e in entries {
        let weight = match (e.horse_weight, e.weight_change) {
            (Some(w), Some(c)) => format!("{}({:+})", w, c),
            _ => "-".to_string(),
        };
        println!(
            "{:>3} {:>2} {:>3}  {:<18} {:>6} {:>5} {:>4} {:>8} {:>6}",
            e.rank,
            or_dash(e.bracket),
            e.horse_number,
            e.horse_name,
            e.finish_time.map(seconds_to_text).unwrap_or_else(|| "-".to_string()),
            or_dash(e.win_odds),
            or_dash(e.popularity),
            weight,
            or_dash(e.place_payout),
        );
    }

    if let Some(payout) = &info.payout {
        println!();
        println!("=== Payouts ===");
        for category in BetCategory::ALL {
            if let Some(p) = payout.get(category) {
                println!(
                    "  {:<6} {:<16} {:>16} ({})",
                    category.label(),
                    p.combination,
                    p.refund,
                    p.popularity
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crawl_args() {
        let cli = Cli::try_parse_from([
            "keiba-crawler",
            "crawl",
            "--start-year",
            "2019",
            "--end-year",
            "2020",
            "--backend",
            "csv",
            "--interval",
            "2.5",
        ])
        .unwrap();

        match cli.command {
            Commands::Crawl {
                range,
                store,
                interval,
            } => {
                assert_eq!(range.start_year, Some(2019));
                assert_eq!(range.end_year, Some(2020));
                assert_eq!(store.backend, Some(Backend::Csv));
                assert_eq!(interval, Some(2.5));
            }
            _ => panic!("expected crawl"),
        }
    }

    #[test]
    fn test_parse_show_args() {
        let cli =
            Cli::try_parse_from(["keiba-crawler", "show", "202406050811", "--format", "json"])
                .unwrap();
        match cli.command {
            Commands::Show {
                race_id, format, ..
            } => {
                assert_eq!(race_id.to_string(), "202406050811");
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected show"),
        }

        assert!(Cli::try_parse_from(["keiba-crawler", "show", "2024"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let range = RangeArgs {
            start_year: Some(2001),
            end_year: Some(2002),
            config: None,
        };
        let store = StoreArgs {
            backend: Some(Backend::Csv),
            db: None,
            csv_info: Some(PathBuf::from("out/info.csv")),
            csv_data: None,
        };

        let config = load_config(&range, &store).unwrap();
        assert_eq!(config.crawl.start_year, 2001);
        assert_eq!(config.crawl.end_year, 2002);
        assert_eq!(config.storage.backend, Backend::Csv);
        assert_eq!(config.storage.csv_info_path, PathBuf::from("out/info.csv"));
        assert_eq!(config.storage.csv_data_path, PathBuf::from("netkeiba_data.csv"));
    }
}
