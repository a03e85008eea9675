use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use search_core::{Error, Generation, Result};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::ingestor::Ingestor;

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub ready: bool,
    pub generation: Option<u64>,
    pub documents: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub loaded_at: Option<OffsetDateTime>,
    pub last_refresh_error: Option<String>,
}

#[derive(Debug, Default)]
struct RefreshStatus {
    last_error: Option<String>,
}

/// Owns the live generation. Loads build a new generation off to the side
/// and publish it with a single pointer swap.
pub struct Coordinator {
    ingestor: Ingestor,
    active: ArcSwapOption<Generation>,
    next_generation: AtomicU64,
    rebuild: Mutex<()>,
    status: RwLock<RefreshStatus>,
}

impl Coordinator {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor,
            active: ArcSwapOption::empty(),
            next_generation: AtomicU64::new(1),
            rebuild: Mutex::new(()),
            status: RwLock::new(RefreshStatus::default()),
        }
    }

    /// First load. The caller should not accept queries until this succeeds.
    pub async fn load_initial(&self) -> Result<Arc<Generation>> {
        self.rebuild("initial load").await
    }

    /// Reload everything. On failure the live generation is left as it was.
    pub async fn refresh(&self) -> Result<Arc<Generation>> {
        self.rebuild("refresh").await
    }

    /// The generation queries should run against, if any has been published.
    pub fn current(&self) -> Option<Arc<Generation>> {
        self.active.load_full()
    }

    pub fn health(&self) -> Health {
        let current = self.current();
        Health {
            ready: current.is_some(),
            generation: current.as_ref().map(|g| g.id()),
            documents: current.as_ref().map_or(0, |g| g.len()),
            loaded_at: current.as_ref().map(|g| g.built_at()),
            last_refresh_error: self.status.read().last_error.clone(),
        }
    }

    /// Refresh on a fixed interval until the handle is aborted. The first
    /// tick fires one `every` after the call.
    pub fn spawn_periodic_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = this.refresh().await {
                    warn!(error = %e, "scheduled refresh failed");
                }
            }
        })
    }

    async fn rebuild(&self, reason: &'static str) -> Result<Arc<Generation>> {
        let _guard = self.rebuild.try_lock().map_err(|_| Error::RefreshInProgress)?;
        info!(reason, "building new generation");
        match self.build_next().await {
            Ok(generation) => {
                let generation = Arc::new(generation);
                let previous = self.active.swap(Some(Arc::clone(&generation)));
                self.status.write().last_error = None;
                info!(
                    reason,
                    generation = generation.id(),
                    documents = generation.len(),
                    previous = ?previous.map(|g| g.id()),
                    "generation published"
                );
                Ok(generation)
            }
            Err(e) => {
                self.status.write().last_error = Some(e.to_string());
                match self.current() {
                    Some(live) => warn!(reason, error = %e, serving = live.id(), "load failed, keeping live generation"),
                    None => error!(reason, error = %e, "load failed and no generation is live"),
                }
                Err(e)
            }
        }
    }

    async fn build_next(&self) -> Result<Generation> {
        let messages = self.ingestor.load_all().await?;
        let id = self.next_generation.fetch_add(1, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || Generation::build(id, messages))
            .await
            .map_err(|e| Error::Build(e.to_string()))?
    }
}
