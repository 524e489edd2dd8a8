//! src/storage/error.rs
use super::StorageKey;
use crate::telemetry::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum StorageError {
    #[error("The specified entity {0} does not exist")]
    NotFound(StorageKey),
    #[error("The specified entity {0} already exists")]
    Conflict(StorageKey),
    #[error("The ETag of entity {0} does not match the expected value")]
    PreconditionFailed(StorageKey),
    #[error("Table {0} does not exist")]
    TableNotFound(String),
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
    #[error("The operation did not complete within the time limit after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    #[error("The storage service is unavailable")]
    Unavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    /// Timeouts and transient service failures are worth another attempt;
    /// everything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Timeout { .. } | StorageError::Unavailable(_)
        )
    }
}

impl std::fmt::Debug for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(e.into())
            }
            e => StorageError::Backend(e.into()),
        }
    }
}
