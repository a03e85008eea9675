use std::collections::HashSet;
use std::time::{Duration, Instant};

use search_core::{Error, Message, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::fetcher::PageFetcher;
use crate::upstream::PageToken;

/// Walks the upstream feed page by page and returns the complete message set.
#[derive(Clone)]
pub struct Ingestor {
    fetcher: PageFetcher,
    /// Pause between successful pages; rapid paging is what triggers throttling.
    page_delay: Duration,
}

impl Ingestor {
    pub fn new(fetcher: PageFetcher, page_delay: Duration) -> Self {
        Self { fetcher, page_delay }
    }

    /// Fetch every page in order. Any page that fails for good fails the
    /// whole load; nothing partial is returned.
    pub async fn load_all(&self) -> Result<Vec<Message>> {
        let start = Instant::now();
        let mut messages: Vec<Message> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut expected: Option<usize> = None;
        let mut pages = 0usize;
        let mut token = Some(PageToken::first());

        info!("starting upstream load");
        while let Some(current) = token {
            if pages > 0 && !self.page_delay.is_zero() {
                sleep(self.page_delay).await;
            }
            let (page, next) = self.fetcher.fetch_page(current).await?;
            pages += 1;
            if page.total.is_some() {
                expected = page.total;
            }
            let received = page.items.len();
            for msg in page.items {
                if !seen.insert(msg.id.clone()) {
                    warn!(id = %msg.id, skip = current.skip(), "duplicate message id across pages");
                    return Err(Error::DuplicateDocument(msg.id));
                }
                messages.push(msg);
            }
            debug!(page = pages, skip = current.skip(), received, fetched = messages.len(), ?expected, "page loaded");
            token = next;
        }

        if let Some(total) = expected {
            if total != messages.len() {
                warn!(fetched = messages.len(), expected = total, "upstream total does not match fetched count");
            }
        }
        info!(
            pages,
            documents = messages.len(),
            took_ms = start.elapsed().as_millis() as u64,
            "upstream load complete"
        );
        Ok(messages)
    }
}
