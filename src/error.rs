//! Error types for store operations.

use thiserror::Error;

/// Failures surfaced by [`crate::SqliteStore`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An `ALTER TABLE` operation keyword outside the allowed set.
    /// Raised while parsing input, before any statement reaches the engine.
    #[error("Invalid alter operation: {0} (expected ADD or DROP)")]
    InvalidAlterOperation(String),

    /// Any failure reported by the engine while executing a statement.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failure reported by the engine while releasing the connection.
    #[error("Failed to close connection: {0}")]
    Close(rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
