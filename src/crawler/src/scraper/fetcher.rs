//! Race page fetching.
//!
//! A fetcher turns a race ID into either page HTML or `Absent`. Absent is an
//! expected outcome (the race never ran), not an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::historical::{race_result_url, RaceResultParser};
use crate::config::FetchConfig;
use crate::error::CrawlError;
use crate::race_id::RaceId;
use crate::retry::{retry_transient, Backoff};

/// Fallback charset when the response does not declare one
const PAGE_CHARSET: &str = "EUC-JP";

/// Result of fetching one race page
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Page HTML with a results table
    Page(String),
    /// No results table: the race does not exist
    Absent,
}

/// Source of race result pages
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, race_id: &RaceId) -> Result<FetchOutcome, CrawlError>;
}

/// Fetcher for db.netkeiba.com over HTTP
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    backoff: Backoff,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration
    pub fn new(config: &FetchConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            backoff: Backoff::for_fetch(config),
        })
    }

    /// GET a page; `None` on 404
    async fn get_page(&self, url: &str) -> Result<Option<String>, CrawlError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CrawlError::Fetch(format!("HTTP {} for {}", status, url)));
        }

        let html = response.text_with_charset(PAGE_CHARSET).await?;
        Ok(Some(html))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, race_id: &RaceId) -> Result<FetchOutcome, CrawlError> {
        let url = race_result_url(&self.base_url, race_id);
        debug!("Fetching {}", url);

        let page =
            retry_transient(&self.backoff, &format!("fetch {}", race_id), || self.get_page(&url))
                .await?;

        Ok(match page {
            Some(html) if RaceResultParser::has_result_table(&html) => FetchOutcome::Page(html),
            _ => FetchOutcome::Absent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_default_config() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        assert_eq!(fetcher.base_url, "https://db.netkeiba.com");
        assert_eq!(fetcher.backoff.max_retries, 3);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let config = FetchConfig {
            // discard port, nothing listens there
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            max_retries: 0,
            ..FetchConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let id: RaceId = "202406050811".parse().unwrap();

        let result = fetcher.fetch(&id).await;
        assert!(matches!(result, Err(CrawlError::Fetch(_))));
    }
}
