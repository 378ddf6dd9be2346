//! Error taxonomy for the crawl pipeline.
//!
//! Every variant describes a per-identifier outcome. The coordinator catches
//! them at the loop boundary, logs them with the race ID and [`CrawlError::kind`],
//! and moves on to the next candidate.

use thiserror::Error;

use crate::race_id::RaceId;

/// Crawl errors
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("race page has no results table")]
    NotFound,

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("failed to extract {field}: {reason}")]
    FatalExtraction { field: &'static str, reason: String },

    #[error("venue code {0} is outside the venue table")]
    Lookup(u8),

    #[error("race {0} is already persisted")]
    PersistenceConflict(RaceId),

    #[error("storage unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("invalid race id: {0}")]
    InvalidRaceId(String),

    #[error("invalid year range: {start}..={end}")]
    InvalidYearRange { start: u16, end: u16 },
}

impl CrawlError {
    /// Build a fatal extraction error for a required field
    pub fn extraction(field: &'static str, reason: impl Into<String>) -> Self {
        CrawlError::FatalExtraction {
            field,
            reason: reason.into(),
        }
    }

    /// Worth another attempt: network and HTTP status failures
    pub fn is_transient(&self) -> bool {
        matches!(self, CrawlError::Fetch(_))
    }

    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::NotFound => "not_found",
            CrawlError::Fetch(_) => "fetch",
            CrawlError::FatalExtraction { .. } => "fatal_extraction",
            CrawlError::Lookup(_) => "lookup",
            CrawlError::PersistenceConflict(_) => "persistence_conflict",
            CrawlError::PersistenceUnavailable(_) => "persistence_unavailable",
            CrawlError::InvalidRaceId(_) => "invalid_race_id",
            CrawlError::InvalidYearRange { .. } => "invalid_year_range",
        }
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(e: reqwest::Error) -> Self {
        CrawlError::Fetch(e.to_string())
    }
}
