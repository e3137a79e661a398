//! Bounded retry with exponential backoff.
//!
//! [`attempt`] runs an async operation up to `max_tries` times, sleeping
//! `backoff(n)` after the n-th failure (n starting at 0). The classifier uses
//! `2^n` seconds: 1s after the first failure, 2s after the second.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

/// `base * 2^n`, capped at `max`.
pub fn exponential(base: Duration, max: Duration) -> impl Fn(u32) -> Duration {
    move |n| base.saturating_mul(1u32.checked_shl(n).unwrap_or(u32::MAX)).min(max)
}

/// Run `op` until it succeeds or `max_tries` attempts have failed.
///
/// Returns the last error once the attempts are exhausted; no sleep follows
/// the final failure. `max_tries` of zero is treated as one.
pub async fn attempt<T, E, F, Fut, B>(
    label: &str,
    max_tries: u32,
    backoff: B,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32) -> Duration,
    E: Display,
{
    let max_tries = max_tries.max(1);
    let total_t0 = Instant::now();
    let mut n = 0u32;

    loop {
        let attempt_t0 = Instant::now();
        match op(n).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let attempt_dt = attempt_t0.elapsed();
                let total_dt = total_t0.elapsed();

                if n + 1 >= max_tries {
                    error!(
                        label,
                        attempt = n + 1,
                        max = max_tries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        error = %e,
                        "Exhausted retries"
                    );
                    return Err(e);
                }

                let delay = backoff(n);
                warn!(
                    label,
                    attempt = n + 1,
                    max = max_tries,
                    elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                    ?delay,
                    error = %e,
                    "Attempt failed; backing off"
                );
                sleep(delay).await;
                n += 1;
            }
        }
    }
}
