use super::RpcError;
use std::{future::Future, time::Duration};
use tracing::{debug, warn};

/// Lowest allowed backoff ceiling
pub const BACKOFF_FLOOR: Duration = Duration::from_secs(2);
/// Ceiling used when the configured one cannot be represented
pub const BACKOFF_OVERFLOW_CEILING: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `None` retries forever
    pub max_retries: Option<u32>,
    /// Wait before the first retry, doubled for each later one
    pub base_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Some(10),
            base_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A negative count means retry forever
    pub fn from_config(retry_attempts: i64, max_wait_secs: u64) -> Self {
        let max_wait = Duration::try_from_secs_f64(max_wait_secs as f64)
            .unwrap_or(BACKOFF_OVERFLOW_CEILING);
        Self {
            max_retries: u32::try_from(retry_attempts).ok(),
            max_wait,
            ..Self::default()
        }
    }

    pub fn ceiling(&self) -> Duration {
        self.max_wait.max(BACKOFF_FLOOR)
    }

    fn allows_retry(&self, failures: u32) -> bool {
        self.max_retries.map_or(true, |max| failures <= max)
    }
}

/// Wait before retry number `attempt` (0 based) and whether it hit the
/// ceiling, after which callers stop recomputing it
pub fn backoff_for_attempt(attempt: u32, base: Duration, ceiling: Duration) -> (Duration, bool) {
    let wait = 2u32
        .checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor));
    match wait {
        Some(wait) if wait < ceiling => (wait, false),
        _ => (ceiling, true),
    }
}

/// Call `request` until it succeeds or the policy gives up
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut request: F,
) -> Result<T, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let ceiling = policy.ceiling();
    let (mut wait, mut max_reached) = backoff_for_attempt(0, policy.base_wait, ceiling);
    let mut failures = 0;

    loop {
        match request().await {
            Ok(output) => return Ok(output),
            Err(e) => {
                failures += 1;
                if !policy.allows_retry(failures) {
                    warn!("{what} failed, giving up after {failures} attempts: {e}");
                    return Err(if failures > 1 {
                        RpcError::RetriesExhausted {
                            attempts: failures,
                            last: Box::new(e),
                        }
                    } else {
                        e
                    });
                }

                warn!("{what} failed, backing off and trying again: {e}");
                debug!("Attempt {failures} with wait time {wait:?}");
                tokio::time::sleep(wait).await;
                if !max_reached {
                    (wait, max_reached) = backoff_for_attempt(failures, policy.base_wait, ceiling);
                }
            }
        }
    }
}
