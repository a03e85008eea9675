#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ingest::{AttemptError, Coordinator, Ingestor, Page, PageFetcher, PageToken, RetryPolicy, Upstream};
use parking_lot::Mutex;
use search_core::Message;
use time::macros::datetime;
use tokio::sync::Semaphore;

pub fn msg(id: &str, author: &str, text: &str, minute: i64) -> Message {
    Message::new(id, author, text, datetime!(2025-05-01 10:00 UTC) + time::Duration::minutes(minute))
}

/// The five-message feed used across scenarios.
pub fn feed() -> Vec<Message> {
    vec![
        msg("m1", "Ana", "Book a flight to Rome, urgent please", 1),
        msg("m2", "flight", "Dinner reservation for four", 2),
        msg("m3", "Omar Haddad", "Need tickets for the opera", 3),
        msg("m4", "Li-Wei", "Send the car at 8", 4),
        msg("m5", "Sophia Al-Farsi", "Is the villa ready?", 5),
    ]
}

/// In-memory paginated feed with scripted failures and an optional gate.
pub struct FakeUpstream {
    data: Mutex<Vec<Message>>,
    page_size: usize,
    failures: Mutex<HashMap<usize, VecDeque<AttemptError>>>,
    calls: Mutex<Vec<usize>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeUpstream {
    pub fn new(data: Vec<Message>, page_size: usize) -> Self {
        Self {
            data: Mutex::new(data),
            page_size,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Make the next request for `skip` fail with `err`. Queues in order.
    pub fn fail_at(&self, skip: usize, err: AttemptError) {
        self.failures.lock().entry(skip).or_default().push_back(err);
    }

    pub fn replace_data(&self, data: Vec<Message>) {
        *self.data.lock() = data;
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }

    /// Block every request until permits are added to the returned semaphore.
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn get_page(&self, token: PageToken) -> Result<Page, AttemptError> {
        self.calls.lock().push(token.skip());
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("gate semaphore closed");
        }
        if let Some(err) = self.failures.lock().get_mut(&token.skip()).and_then(|q| q.pop_front()) {
            return Err(err);
        }
        let data = self.data.lock();
        let start = token.skip().min(data.len());
        let end = (start + self.page_size).min(data.len());
        Ok(Page { total: Some(data.len()), items: data[start..end].to_vec() })
    }
}

pub fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(8),
        jitter: Duration::ZERO,
    }
}

pub fn ingestor(upstream: &Arc<FakeUpstream>, policy: RetryPolicy, page_delay: Duration) -> Ingestor {
    let upstream: Arc<dyn Upstream> = upstream.clone();
    Ingestor::new(PageFetcher::new(upstream, policy), page_delay)
}

pub fn coordinator(upstream: &Arc<FakeUpstream>) -> Arc<Coordinator> {
    Arc::new(Coordinator::new(ingestor(upstream, quick_policy(3), Duration::ZERO)))
}
