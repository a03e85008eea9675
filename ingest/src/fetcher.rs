use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use search_core::{Error, Result};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::upstream::{AttemptError, Page, PageToken, Upstream};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per page, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to every backoff.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): doubling from `base_delay`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jitter_sample(&self) -> Duration {
        let max = self.jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

/// Retry state for one page. Pure bookkeeping, no I/O.
#[derive(Debug)]
pub struct Backoff<'p> {
    policy: &'p RetryPolicy,
    failures: u32,
}

impl<'p> Backoff<'p> {
    pub fn new(policy: &'p RetryPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    /// Attempts that have failed so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failed attempt and return how long to wait before the next
    /// one, or `None` once the attempt budget is spent. A server-provided
    /// `hint` (Retry-After) raises the wait but never past `max_delay`.
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.policy.max_attempts {
            return None;
        }
        let mut delay = self.policy.backoff(self.failures);
        if let Some(hint) = hint {
            delay = delay.max(hint.min(self.policy.max_delay));
        }
        Some(delay + self.policy.jitter_sample())
    }
}

/// Fetches one page, retrying transient failures with exponential backoff.
#[derive(Clone)]
pub struct PageFetcher {
    upstream: Arc<dyn Upstream>,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(upstream: Arc<dyn Upstream>, policy: RetryPolicy) -> Self {
        Self { upstream, policy }
    }

    pub async fn fetch_page(&self, token: PageToken) -> Result<(Page, Option<PageToken>)> {
        let mut backoff = Backoff::new(&self.policy);
        loop {
            let err = match self.upstream.get_page(token).await {
                Ok(page) => {
                    let next = page.next_token(token);
                    return Ok((page, next));
                }
                Err(AttemptError::Rejected { status, message }) => {
                    error!(skip = token.skip(), status, %message, "upstream rejected page request");
                    return Err(Error::UpstreamRejected { status, message });
                }
                Err(err) => err,
            };
            match backoff.next_delay(err.retry_after()) {
                Some(delay) => {
                    warn!(
                        skip = token.skip(),
                        attempt = backoff.failures(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "page fetch failed, backing off"
                    );
                    sleep(delay).await;
                }
                None => {
                    error!(skip = token.skip(), attempts = backoff.failures(), error = %err, "giving up on page");
                    return Err(Error::UpstreamUnavailable {
                        attempts: backoff.failures(),
                        last_error: err.to_string(),
                    });
                }
            }
        }
    }
}
