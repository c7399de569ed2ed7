//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// Timed out waiting for a named lock.
    #[error("Timed out waiting for lock '{name}'")]
    LockTimeout { name: String },

    /// A stored column did not decode (bad JSON, unknown enum value).
    #[error("Corrupt column '{column}' on {table} row '{id}': {reason}")]
    Corrupt {
        table: &'static str,
        column: &'static str,
        id: String,
        reason: String,
    },
}

impl DatabaseError {
    /// Whether retrying the operation may succeed (lock contention,
    /// busy store). Corruption and migration failures are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            DatabaseError::LockTimeout { .. } => true,
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
