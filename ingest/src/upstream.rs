use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use search_core::Message;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};

/// Continuation token for the upstream: the `skip` offset of the next page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageToken {
    skip: usize,
}

impl PageToken {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn at(skip: usize) -> Self {
        Self { skip }
    }

    pub fn skip(&self) -> usize {
        self.skip
    }
}

/// One upstream page as returned on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub items: Vec<Message>,
}

impl Page {
    /// Token for the page after this one, or `None` when the feed is exhausted.
    pub fn next_token(&self, current: PageToken) -> Option<PageToken> {
        if self.items.is_empty() {
            return None;
        }
        let next = current.skip + self.items.len();
        match self.total {
            Some(total) if next >= total => None,
            _ => Some(PageToken::at(next)),
        }
    }
}

/// Outcome of a single failed request, before any retry decision.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("transient upstream failure: {0}")]
    Transient(String),

    #[error("throttled by upstream")]
    Throttled { retry_after: Option<Duration> },

    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl AttemptError {
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AttemptError::Throttled { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Map a non-success status to its retry class.
    pub fn from_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            AttemptError::Throttled { retry_after }
        } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            AttemptError::Transient(format!("status {status}"))
        } else {
            AttemptError::Rejected { status: status.as_u16(), message: body.chars().take(200).collect() }
        }
    }
}

/// A single request against the paginated feed. Retries live in `PageFetcher`.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_page(&self, token: PageToken) -> Result<Page, AttemptError>;
}

pub struct HttpUpstream {
    client: Client,
    base_url: Url,
    page_limit: usize,
}

impl HttpUpstream {
    pub fn new(base_url: &str, page_limit: usize, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url: Url::parse(base_url)?, page_limit: page_limit.max(1) })
    }

    fn page_url(&self, token: PageToken) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("skip", &token.skip.to_string())
            .append_pair("limit", &self.page_limit.to_string());
        url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_page(&self, token: PageToken) -> Result<Page, AttemptError> {
        let url = self.page_url(token);
        trace!(%url, "requesting page");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp.headers().get(header::RETRY_AFTER).and_then(|v| {
                let parsed = parse_retry_after(v.to_str().unwrap_or_default());
                if parsed.is_none() {
                    debug!(value = ?v, "ignoring Retry-After that is not delta-seconds");
                }
                parsed
            });
            let body = resp.text().await.unwrap_or_default();
            return Err(AttemptError::from_status(status, retry_after, &body));
        }

        let bytes = resp.bytes().await.map_err(|e| AttemptError::Transient(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| AttemptError::Transient(format!("malformed page: {e}")))
    }
}

/// Delta-seconds form only; HTTP-date values yield `None`.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
