use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::fetcher::{PageFetcher, RetryPolicy};
use crate::ingestor::Ingestor;
use crate::upstream::HttpUpstream;

/// Upstream and retry settings shared by every binary that loads the feed.
#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    /// Paginated messages endpoint
    #[arg(
        long,
        env = "UPSTREAM_URL",
        default_value = "https://november7-730026606190.europe-west1.run.app/messages/"
    )]
    pub upstream_url: String,
    /// Messages requested per page
    #[arg(long, env = "PAGE_LIMIT", default_value_t = 100)]
    pub page_limit: usize,
    /// Attempts per page before giving up
    #[arg(long, env = "MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,
    /// First backoff delay, doubled on every retry
    #[arg(long, env = "BASE_DELAY_MS", default_value_t = 500)]
    pub base_delay_ms: u64,
    /// Backoff ceiling
    #[arg(long, env = "MAX_DELAY_MS", default_value_t = 8_000)]
    pub max_delay_ms: u64,
    /// Random extra delay added to each backoff
    #[arg(long, env = "JITTER_MS", default_value_t = 100)]
    pub jitter_ms: u64,
    /// Pause between successful pages
    #[arg(long, env = "PAGE_DELAY_MS", default_value_t = 500)]
    pub page_delay_ms: u64,
    /// Per-request timeout
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
    #[arg(long, env = "USER_AGENT", default_value = "message-search/0.1")]
    pub user_agent: String,
}

impl UpstreamArgs {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }

    pub fn build_ingestor(&self) -> Result<Ingestor> {
        let upstream = HttpUpstream::new(
            &self.upstream_url,
            self.page_limit,
            Duration::from_secs(self.request_timeout_secs),
            &self.user_agent,
        )?;
        let fetcher = PageFetcher::new(Arc::new(upstream), self.retry_policy());
        Ok(Ingestor::new(fetcher, Duration::from_millis(self.page_delay_ms)))
    }
}
