//! Web scraper module for db.netkeiba.com
//!
//! Provides page fetching, request pacing and result-page parsing.

pub mod fetcher;
pub mod historical;
pub mod rate_limiter;

pub use fetcher::{FetchOutcome, Fetcher, HttpFetcher};
pub use rate_limiter::RateLimiter;

/// Base URL for the race database
pub const DB_URL: &str = "https://db.netkeiba.com";
