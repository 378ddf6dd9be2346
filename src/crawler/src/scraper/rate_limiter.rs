//! Minimum spacing between requests.
//!
//! The crawler runs one request at a time, so a per-request floor is enough.
//! Concurrent fetching would need a shared gate instead.

use tokio::time::{Duration, Instant};
use tracing::debug;

/// Enforces a floor on the time between the starts of consecutive requests
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `min_interval` - Minimum time from one request start to the next
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    /// Create from a seconds value, clamping negatives to zero
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs.max(0.0)))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time still owed before the next request may start
    pub fn remaining(&self, started: Instant) -> Duration {
        self.min_interval.saturating_sub(started.elapsed())
    }

    /// Sleep until `min_interval` has passed since `started`
    pub async fn wait_since(&self, started: Instant) {
        let delay = self.remaining(started);
        if delay.is_zero() {
            return;
        }
        debug!("Pacing for {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

impl Default for RateLimiter {
    /// One request per second
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
