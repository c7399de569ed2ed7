//! Database module for persistent storage.
//!
//! Uses rusqlite (SQLite) with a thread-safe `Database` handle.
//! All access is serialized through a `Mutex<Connection>`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod client_repo;
pub mod error;
pub mod form_repo;
pub mod invoice_repo;
pub mod job_repo;
pub mod locks;
pub mod migrations;
pub mod quote_repo;
pub mod transition_repo;

pub use error::DatabaseError;
pub use locks::{LockGuard, LockManager};

/// How long a statement may wait on SQLite's own file lock before failing
/// with `SQLITE_BUSY` instead of hanging.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Cloning is cheap (inner `Arc`). All access is serialized through
/// a `Mutex`, which is fine for SQLite (which serializes writes anyway).
/// WAL mode is enabled for concurrent read performance. The handle also
/// carries the [`LockManager`] used for multi-statement critical sections
/// (job transitions, invoice numbering), so all clones share one lock
/// namespace.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    locks: Arc<LockManager>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            locks: Arc::new(LockManager::new()),
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            locks: Arc::new(LockManager::new()),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a single IMMEDIATE transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err` —
    /// so a rejected closure leaves no partial writes behind. The error
    /// type is generic so domain closures can return their own errors.
    pub fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<DatabaseError>,
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| E::from(DatabaseError::LockPoisoned))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| E::from(DatabaseError::Sqlite(e)))?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(|e| E::from(DatabaseError::Sqlite(e)))?;
                Ok(value)
            }
            // Dropping the transaction rolls it back.
            Err(e) => Err(e),
        }
    }

    /// Named locks shared by all clones of this handle.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }
}

/// Returns the canonical database path: `~/.fieldflow/data/fieldflow.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".fieldflow").join("data").join("fieldflow.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.ends_with("fieldflow.db"));
        assert!(path.to_string_lossy().contains(".fieldflow"));
    }

    #[test]
    fn test_with_tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<(), DatabaseError> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO clients (id, name, category, created_at, updated_at)
                 VALUES ('c1', 'Rollback', 'potential', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                [],
            )?;
            Err(DatabaseError::LockPoisoned)
        });
        assert!(result.is_err());

        db.with_conn(|conn| {
            let count: u32 = conn.query_row("SELECT COUNT(*) FROM clients", [], |r| r.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_with_tx_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();

        db.with_tx(|tx| -> Result<(), DatabaseError> {
            tx.execute(
                "INSERT INTO clients (id, name, category, created_at, updated_at)
                 VALUES ('c1', 'Commit', 'potential', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        db.with_conn(|conn| {
            let count: u32 = conn.query_row("SELECT COUNT(*) FROM clients", [], |r| r.get(0))?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }
}
