//! Minimum spacing between outbound classification calls.
//!
//! The model provider grants a fixed number of requests per minute, so calls
//! are spaced `60 / requests_per_minute` seconds apart, measured from the start
//! of one call to the start of the next. One [`RateLimiter`] is shared (behind
//! an `Arc`) by everything that talks to the provider.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_call: Mutex::new(None),
        }
    }

    /// Limiter for a budget of `rpm` requests per minute (`rpm` of zero means one).
    pub fn per_minute(rpm: u32) -> Self {
        Self::new(Duration::from_secs(60) / rpm.max(1))
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until the next call may start, then record it as started.
    ///
    /// The lock is held across the wait, so concurrent callers queue up and
    /// each leaves at least `spacing` after the previous one.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.spacing {
                let wait = self.spacing - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Waiting for rate limit");
                sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
