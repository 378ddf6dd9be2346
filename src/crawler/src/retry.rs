//! Backoff for transient fetch failures.
//!
//! Only errors that [`CrawlError::is_transient`] accepts are retried; a page
//! that fails to parse is the same page on the next attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::CrawlError;

/// Exponential backoff schedule
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Attempts after the first
    pub max_retries: u32,
    pub first_delay: Duration,
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: 3,
            first_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl Backoff {
    pub fn for_fetch(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            ..Self::default()
        }
    }

    /// Delays to sleep before each retry, capped at `max_delay`
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(move |n| {
            self.first_delay
                .saturating_mul(self.factor.saturating_pow(n))
                .min(self.max_delay)
        })
    }
}

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// the schedule runs out
pub async fn retry_transient<T, F, Fut>(
    backoff: &Backoff,
    what: &str,
    mut operation: F,
) -> Result<T, CrawlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CrawlError>>,
{
    let mut delays = backoff.delays();
    let mut retries = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("{} succeeded after {} retries", what, retries);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_transient() {
            return Err(err);
        }
        let Some(delay) = delays.next() else {
            return Err(err);
        };

        retries += 1;
        warn!(
            "{} failed ({}/{}): {}; retrying in {:?}",
            what,
            retries,
            backoff.max_retries + 1,
            err,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}
