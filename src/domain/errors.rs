//! Pipeline error types
//!
//! Fetch problems never appear here: the fetcher absorbs them into a
//! `Resolution` (see `infrastructure::category_fetcher`). What is left are the
//! faults that callers must react to.

use thiserror::Error;

use crate::domain::job::JobId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategorizerError {
    /// Submission rejected before a job was created
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The category cache could not complete a read or write
    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job cancelled")]
    Cancelled,
}

impl CategorizerError {
    /// Whether the error is an infrastructure fault that aborts a job
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

pub type CategorizerResult<T> = Result<T, CategorizerError>;
