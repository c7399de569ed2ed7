//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_clients_and_properties",
        sql: include_str!("sql/001_create_clients.sql"),
    },
    Migration {
        version: 2,
        description: "create_quotes",
        sql: include_str!("sql/002_create_quotes.sql"),
    },
    Migration {
        version: 3,
        description: "create_jobs",
        sql: include_str!("sql/003_create_jobs.sql"),
    },
    Migration {
        version: 4,
        description: "create_job_state_transitions",
        sql: include_str!("sql/004_create_job_state_transitions.sql"),
    },
    Migration {
        version: 5,
        description: "create_invoices",
        sql: include_str!("sql/005_create_invoices.sql"),
    },
    Migration {
        version: 6,
        description: "create_job_forms",
        sql: include_str!("sql/006_create_job_forms.sql"),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    // Create the migrations tracking table.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
