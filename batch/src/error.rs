//! Batch errors.

use shopfront_core::error::DomainError;
use shopfront_core::providers::RepositoryError;
use thiserror::Error;

/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Batch failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The job already has an execution in progress.
    #[error("Job '{0}' is already running")]
    AlreadyRunning(String),

    /// No job is registered under this name.
    #[error("Unknown job '{0}'")]
    UnknownJob(String),

    /// Cron expression could not be parsed.
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule {
        /// Expression as configured
        expression: String,
        /// Parser message
        reason: String,
    },

    /// Reading, processing or writing items failed.
    #[error("Step '{step}' failed: {reason}")]
    StepFailed {
        /// Step name
        step: String,
        /// Failure message
        reason: String,
    },

    /// Report storage failed.
    #[error("Report store error: {0}")]
    Store(String),
}

impl From<DomainError> for BatchError {
    fn from(error: DomainError) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<sqlx::Error> for BatchError {
    fn from(error: sqlx::Error) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<RepositoryError> for BatchError {
    fn from(error: RepositoryError) -> Self {
        Self::Store(error.to_string())
    }
}
