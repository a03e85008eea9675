//! Loading the upstream feed and publishing searchable generations.

pub mod config;
pub mod coordinator;
pub mod fetcher;
pub mod ingestor;
pub mod upstream;

pub use config::UpstreamArgs;
pub use coordinator::{Coordinator, Health};
pub use fetcher::{Backoff, PageFetcher, RetryPolicy};
pub use ingestor::Ingestor;
pub use upstream::{AttemptError, HttpUpstream, Page, PageToken, Upstream};
