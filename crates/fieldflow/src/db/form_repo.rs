//! Job form repository — safety/compliance forms attached to a job.

use rusqlite::{params, Connection, Row};

use super::error::DatabaseError;

pub const STATUS_COMPLETED: &str = "completed";

/// A form attached to a job.
#[derive(Debug, Clone)]
pub struct FormRow {
    pub id: String,
    pub job_id: String,
    pub name: String,
    pub status: String,
    pub created_at: String,
}

impl FormRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            name: row.get("name")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn insert(conn: &Connection, form: &FormRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO job_forms (id, job_id, name, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![form.id, form.job_id, form.name, form.status, form.created_at],
    )?;
    Ok(())
}

/// All forms attached to a job.
pub fn for_job(conn: &Connection, job_id: &str) -> Result<Vec<FormRow>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM job_forms WHERE job_id = ?1 ORDER BY created_at")?;
    let rows = stmt
        .query_map(params![job_id], FormRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Names of a job's forms that are not yet completed.
pub fn incomplete_for_job(conn: &Connection, job_id: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM job_forms WHERE job_id = ?1 AND status <> ?2 ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map(params![job_id, STATUS_COMPLETED], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
