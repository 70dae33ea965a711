//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database schema is corrupted (missing tables: {0}); a forced regeneration is required")]
    SchemaCorrupted(String),

    #[error("subject not found: {0}")]
    SubjectNotFound(i64),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(i64),

    #[error("API token not set")]
    MissingApiKey,
}
