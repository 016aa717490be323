//! Collaborator failure model.

use thiserror::Error;

/// Result type for calls into external collaborators (permission source,
/// tenant lookups, paged data fetch).
pub type SourceResult<T> = Result<T, SourceError>;

/// Failure reported by a data-source collaborator.
///
/// This subsystem never retries or reinterprets these; they are propagated
/// to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The collaborator could not be reached.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The collaborator was reached but the operation failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SourceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Shorthand for a poisoned in-process lock.
    pub fn poisoned(what: &str) -> Self {
        Self::Storage(format!("{what} lock poisoned"))
    }
}
