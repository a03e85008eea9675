use std::time::Duration;

use thiserror::Error;

use crate::DocId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transient upstream failures outlasted the retry budget.
    #[error("upstream unavailable after {attempts} attempts: {last_error}")]
    UpstreamUnavailable { attempts: u32, last_error: String },

    /// The upstream answered with a non-retryable status.
    #[error("upstream rejected the request with status {status}: {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("duplicate document id: {0}")]
    DuplicateDocument(String),

    #[error("message not found: {0}")]
    NotFound(String),

    /// The index points at a document the store does not hold. Always a defect.
    #[error("index references doc {doc} which is absent from the store")]
    InternalInconsistency { doc: DocId },

    #[error("query exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("search service is not ready")]
    NotReady,

    #[error("a refresh is already in progress")]
    RefreshInProgress,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("generation build failed: {0}")]
    Build(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
