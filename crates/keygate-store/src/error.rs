//! Store-specific error types and conversions.

use keygate_core::Error;
use tracing::warn;

/// Storage-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("{entity} not found")]
    NotFound { entity: String },
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity } => Error::NotFound { entity },
            // Backing-store failures are the retryable kind. The driver
            // text goes to the log stream, never into the error a caller
            // sees.
            other => {
                warn!(error = %other, "storage failure");
                Error::unavailable("storage backend failure")
            }
        }
    }
}
