//! Configuration for the crawler.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::scraper::DB_URL;

/// Crawl range and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_start_year")]
    pub start_year: u16,
    #[serde(default = "default_end_year")]
    pub end_year: u16,
    /// Minimum seconds between request starts
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
    /// Consecutive storage-unavailable results before the run aborts
    #[serde(default = "default_max_consecutive_storage_failures")]
    pub max_consecutive_storage_failures: u32,
}

fn default_start_year() -> u16 {
    1986
}

fn default_end_year() -> u16 {
    2020
}

fn default_interval_secs() -> f64 {
    1.0
}

fn default_max_consecutive_storage_failures() -> u32 {
    5
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            interval_secs: default_interval_secs(),
            max_consecutive_storage_failures: default_max_consecutive_storage_failures(),
        }
    }
}

/// HTTP fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DB_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("keiba-crawler/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_retries: default_max_retries(),
        }
    }
}

/// Storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Csv,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_csv_info_path")]
    pub csv_info_path: PathBuf,
    #[serde(default = "default_csv_data_path")]
    pub csv_data_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("netkeiba.db")
}

fn default_csv_info_path() -> PathBuf {
    PathBuf::from("netkeiba_info.csv")
}

fn default_csv_data_path() -> PathBuf {
    PathBuf::from("netkeiba_data.csv")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            db_path: default_db_path(),
            csv_info_path: default_csv_info_path(),
            csv_data_path: default_csv_data_path(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and the environment
    ///
    /// Without an explicit path, `crawler.toml` in the working directory is
    /// read if present. Environment variables use the `KEIBA` prefix with `__`
    /// between sections, e.g. `KEIBA_CRAWL__INTERVAL_SECS=2`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("crawler").required(false),
        };

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("KEIBA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(app)
    }

    /// Reject settings the crawler cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.crawl.start_year > self.crawl.end_year {
            bail!(
                "start_year {} is after end_year {}",
                self.crawl.start_year,
                self.crawl.end_year
            );
        }
        if !self.crawl.interval_secs.is_finite() || self.crawl.interval_secs < 0.0 {
            bail!("interval_secs must be a non-negative number");
        }
        if self.crawl.max_consecutive_storage_failures == 0 {
            bail!("max_consecutive_storage_failures must be at least 1");
        }
        Ok(())
    }
}
