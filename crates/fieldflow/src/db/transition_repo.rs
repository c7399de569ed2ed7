//! Transition audit log — append-only rows for the `job_state_transitions`
//! table. No update or delete exists on purpose.

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::error::DatabaseError;

/// One audit record of a job state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRow {
    pub id: String,
    pub job_id: String,
    /// `None` for the creation transition.
    pub from_state: Option<String>,
    pub to_state: String,
    pub actor: String,
    pub actor_role: Option<String>,
    pub source: String,
    pub reason: Option<String>,
    /// Structured notes/metadata as a JSON string.
    pub notes: Option<String>,
    pub created_at: String,
}

impl TransitionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            from_state: row.get("from_state")?,
            to_state: row.get("to_state")?,
            actor: row.get("actor")?,
            actor_role: row.get("actor_role")?,
            source: row.get("source")?,
            reason: row.get("reason")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Appends one audit row.
pub fn insert(conn: &Connection, record: &TransitionRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO job_state_transitions (id, job_id, from_state, to_state, actor,
         actor_role, source, reason, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.id,
            record.job_id,
            record.from_state,
            record.to_state,
            record.actor,
            record.actor_role,
            record.source,
            record.reason,
            record.notes,
            record.created_at,
        ],
    )?;
    Ok(())
}

/// Returns a job's transitions, newest first. Rowid breaks timestamp ties
/// so rows written in the same instant still read back in insert order.
pub fn history_for_job(conn: &Connection, job_id: &str) -> Result<Vec<TransitionRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM job_state_transitions WHERE job_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map(params![job_id], TransitionRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
