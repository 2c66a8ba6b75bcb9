//! Bounded exponential backoff for transient failures inside the photo
//! client. The dispatch loop's schedule is handled separately and never goes
//! through this helper.

use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// Backoff policy: `attempts` total tries, delay doubling from
/// `base_delay_secs` up to `max_delay_secs`, plus jitter so concurrent
/// requests don't retry in lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_secs: 2,
            max_delay_secs: 30,
        }
    }
}

impl Backoff {
    /// Delay before the attempt following `attempt` (0-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let doubled = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped = doubled.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped + jitter)
    }
}

/// Run `operation`, retrying while `is_transient` approves the error and the
/// attempt budget lasts. Returns the first success or the last error.
pub async fn with_backoff<F, Fut, T, E>(
    policy: &Backoff,
    is_transient: impl Fn(&E) -> bool,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts || !is_transient(&e) {
                    return Err(e);
                }
                let delay = policy.delay_after(attempt - 1);
                tracing::warn!(
                    attempt,
                    attempts,
                    delay_secs = delay.as_secs(),
                    "transient error, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
