//! Storage error types

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Map an sqlx error, folding unique-constraint violations into
    /// `AlreadyExists` so callers can treat them as conflicts.
    pub fn from_sqlx(e: sqlx::Error, what: &str) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StorageError::AlreadyExists(what.to_string());
            }
        }
        StorageError::Query(e.to_string())
    }
}
