use thiserror::Error;

/// Failures surfaced by the job and config stores.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not initialized - call init_db first")]
    NotInitialized,
    #[error("Connection error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    /// The row is no longer `CLAIMED` by the caller.
    #[error("Claim lost: {0}")]
    ClaimLost(String),
}

impl From<jobs_core::ValidationError> for DbError {
    fn from(err: jobs_core::ValidationError) -> Self {
        DbError::Validation(err.to_string())
    }
}
