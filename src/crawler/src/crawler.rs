//! Crawl coordinator.
//!
//! Works through the candidate IDs one at a time in ascending order:
//! fetch, extract, write, then wait out the remainder of the request
//! interval. Every per-race error is logged and counted; only a run of
//! storage-unavailable results stops the crawl early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::race_id::{self, RaceId};
use crate::scraper::historical::RaceResultParser;
use crate::scraper::{FetchOutcome, Fetcher, RateLimiter};
use crate::storage::RaceStore;

/// Shared stop request, checked once per candidate
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Coordinator settings
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Pacing between the starts of consecutive requests
    pub limiter: RateLimiter,
    pub max_consecutive_storage_failures: u32,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            limiter: RateLimiter::from_secs_f64(config.interval_secs),
            max_consecutive_storage_failures: config.max_consecutive_storage_failures,
        }
    }
}

/// Per-race progress: `Pending -> Fetched | Absent -> Persisted | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Pending,
    Fetched,
    Absent,
    Persisted,
    Failed,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every candidate was attempted
    Completed,
    Cancelled,
    /// Too many consecutive writes found the store unavailable
    StorageUnavailable,
}

/// Counts for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub candidates: usize,
    pub persisted: usize,
    pub absent: usize,
    pub failed: usize,
    pub stop_reason: StopReason,
}

impl CrawlSummary {
    fn new(candidates: usize) -> Self {
        Self {
            candidates,
            persisted: 0,
            absent: 0,
            failed: 0,
            stop_reason: StopReason::Completed,
        }
    }

    /// Candidates that reached a final state
    pub fn attempted(&self) -> usize {
        self.persisted + self.absent + self.failed
    }
}

/// Sequential crawler over a fetcher and a store
pub struct Crawler<F, S> {
    fetcher: F,
    store: S,
    settings: CrawlSettings,
    cancel: CancelFlag,
}

impl<F: Fetcher, S: RaceStore> Crawler<F, S> {
    pub fn new(fetcher: F, store: S, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            store,
            settings,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned cancel flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawl every race in the inclusive year range that is not already stored
    pub async fn run(&mut self, start_year: u16, end_year: u16) -> Result<CrawlSummary, CrawlError> {
        let existing = self.store.existing(start_year, end_year)?;
        let candidates = race_id::plan(start_year, end_year, &existing)?;
        let total = candidates.len();

        info!(
            "Crawling {}-{}: {} candidates ({} already stored), interval {:?}",
            start_year,
            end_year,
            total,
            existing.len(),
            self.settings.limiter.min_interval()
        );

        let mut summary = CrawlSummary::new(total);
        let mut consecutive_unavailable = 0u32;

        for (i, race_id) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Cancelled after {}/{} candidates", i, total);
                summary.stop_reason = StopReason::Cancelled;
                break;
            }

            let started = Instant::now();
            let n = i + 1;

            match self.process(race_id).await {
                Ok((RaceState::Persisted, entrants)) => {
                    summary.persisted += 1;
                    consecutive_unavailable = 0;
                    info!("[{}/{}] {} persisted ({} entrants)", n, total, race_id, entrants);
                }
                Ok((state, _)) => {
                    summary.absent += 1;
                    debug!(race_id = %race_id, state = ?state, "[{}/{}] no race", n, total);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(race_id = %race_id, kind = e.kind(), "[{}/{}] failed: {}", n, total, e);

                    if matches!(e, CrawlError::PersistenceUnavailable(_)) {
                        consecutive_unavailable += 1;
                        if consecutive_unavailable >= self.settings.max_consecutive_storage_failures {
                            warn!(
                                "Storage unavailable for {} consecutive races, stopping",
                                consecutive_unavailable
                            );
                            summary.stop_reason = StopReason::StorageUnavailable;
                            break;
                        }
                    }
                }
            }

            self.settings.limiter.wait_since(started).await;
        }

        info!(
            "Crawl finished ({:?}): {}/{} attempted, {} persisted, {} absent, {} failed",
            summary.stop_reason,
            summary.attempted(),
            total,
            summary.persisted,
            summary.absent,
            summary.failed
        );
        Ok(summary)
    }

    /// Take one race from `Pending` to a final state, returning the entrant
    /// count on success
    async fn process(&mut self, race_id: &RaceId) -> Result<(RaceState, usize), CrawlError> {
        debug!(race_id = %race_id, state = ?RaceState::Pending, "Fetching");

        let html = match self.fetcher.fetch(race_id).await? {
            FetchOutcome::Absent => return Ok((RaceState::Absent, 0)),
            FetchOutcome::Page(html) => html,
        };
        debug!(race_id = %race_id, state = ?RaceState::Fetched, bytes = html.len());

        let (info, entries) = match RaceResultParser::parse(&html, race_id) {
            Ok(parsed) => parsed,
            Err(CrawlError::NotFound) => return Ok((RaceState::Absent, 0)),
            Err(e) => return Err(e),
        };
        if entries.is_empty() {
            return Err(CrawlError::extraction("entries", "no finishing horses"));
        }

        self.store.write(&info, &entries).inspect_err(|_| {
            debug!(race_id = %race_id, state = ?RaceState::Failed, "Write rejected");
        })?;
        Ok((RaceState::Persisted, entries.len()))
    }
}
