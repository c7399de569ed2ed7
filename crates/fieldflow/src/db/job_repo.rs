//! Job repository — row access for the `jobs` table.
//!
//! The `status` column is only ever written through the lifecycle
//! orchestrator; nothing here re-checks that, it just moves rows.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::error::DatabaseError;

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub client_id: String,
    pub property_id: Option<String>,
    pub quote_id: Option<String>,
    pub status: String,
    pub last_state_change: Option<String>,
    pub scheduled_date: Option<String>,
    /// JSON array of worker identifiers.
    pub assigned_crew: String,
    pub jha_required: bool,
    /// JSON blob of the job hazard analysis.
    pub jha: Option<String>,
    pub jha_acknowledged_at: Option<String>,
    pub permit_required: bool,
    pub permit_status: Option<String>,
    pub deposit_required: bool,
    pub deposit_status: Option<String>,
    pub work_start_time: Option<String>,
    pub work_end_time: Option<String>,
    /// JSON array of checklist items.
    pub completion_checklist: String,
    pub invoice_id: Option<String>,
    pub payment_received_at: Option<String>,
    pub weather_hold_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry of a job's completion checklist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub item: String,
    pub checked: bool,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            property_id: row.get("property_id")?,
            quote_id: row.get("quote_id")?,
            status: row.get("status")?,
            last_state_change: row.get("last_state_change")?,
            scheduled_date: row.get("scheduled_date")?,
            assigned_crew: row.get("assigned_crew")?,
            jha_required: row.get("jha_required")?,
            jha: row.get("jha")?,
            jha_acknowledged_at: row.get("jha_acknowledged_at")?,
            permit_required: row.get("permit_required")?,
            permit_status: row.get("permit_status")?,
            deposit_required: row.get("deposit_required")?,
            deposit_status: row.get("deposit_status")?,
            work_start_time: row.get("work_start_time")?,
            work_end_time: row.get("work_end_time")?,
            completion_checklist: row.get("completion_checklist")?,
            invoice_id: row.get("invoice_id")?,
            payment_received_at: row.get("payment_received_at")?,
            weather_hold_reason: row.get("weather_hold_reason")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Decodes the assigned crew JSON column.
    pub fn crew(&self) -> Result<Vec<String>, DatabaseError> {
        serde_json::from_str(&self.assigned_crew).map_err(|e| DatabaseError::Corrupt {
            table: "jobs",
            column: "assigned_crew",
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Decodes the completion checklist JSON column.
    pub fn checklist(&self) -> Result<Vec<ChecklistItem>, DatabaseError> {
        serde_json::from_str(&self.completion_checklist).map_err(|e| DatabaseError::Corrupt {
            table: "jobs",
            column: "completion_checklist",
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Inserts a new job row.
pub fn insert(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (id, client_id, property_id, quote_id, status, last_state_change,
         scheduled_date, assigned_crew, jha_required, jha, jha_acknowledged_at,
         permit_required, permit_status, deposit_required, deposit_status,
         work_start_time, work_end_time, completion_checklist, invoice_id,
         payment_received_at, weather_hold_reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
        params![
            job.id,
            job.client_id,
            job.property_id,
            job.quote_id,
            job.status,
            job.last_state_change,
            job.scheduled_date,
            job.assigned_crew,
            job.jha_required,
            job.jha,
            job.jha_acknowledged_at,
            job.permit_required,
            job.permit_status,
            job.deposit_required,
            job.deposit_status,
            job.work_start_time,
            job.work_end_time,
            job.completion_checklist,
            job.invoice_id,
            job.payment_received_at,
            job.weather_hold_reason,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Updates an existing job row. All fields except `id`, `client_id` and
/// `created_at` are overwritten.
pub fn update(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE jobs SET property_id=?2, quote_id=?3, status=?4, last_state_change=?5,
         scheduled_date=?6, assigned_crew=?7, jha_required=?8, jha=?9,
         jha_acknowledged_at=?10, permit_required=?11, permit_status=?12,
         deposit_required=?13, deposit_status=?14, work_start_time=?15,
         work_end_time=?16, completion_checklist=?17, invoice_id=?18,
         payment_received_at=?19, weather_hold_reason=?20, updated_at=?21
         WHERE id=?1",
        params![
            job.id,
            job.property_id,
            job.quote_id,
            job.status,
            job.last_state_change,
            job.scheduled_date,
            job.assigned_crew,
            job.jha_required,
            job.jha,
            job.jha_acknowledged_at,
            job.permit_required,
            job.permit_status,
            job.deposit_required,
            job.deposit_status,
            job.work_start_time,
            job.work_end_time,
            job.completion_checklist,
            job.invoice_id,
            job.payment_received_at,
            job.weather_hold_reason,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Finds a job by its ID.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    conn.query_row("SELECT * FROM jobs WHERE id = ?1", params![id], |row| {
        JobRow::from_row(row)
    })
    .optional()
    .map_err(DatabaseError::Sqlite)
}

/// Stamps `work_start_time` if it is not already set. Returns whether a
/// row was updated, so re-running the automation is harmless.
pub fn stamp_work_start(conn: &Connection, id: &str, at: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET work_start_time = ?2, updated_at = ?3
         WHERE id = ?1 AND work_start_time IS NULL",
        params![id, at, Utc::now().to_rfc3339()],
    )?;
    Ok(changed > 0)
}

/// Links an invoice to a job if no invoice is linked yet.
pub fn link_invoice(conn: &Connection, id: &str, invoice_id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET invoice_id = ?2, updated_at = ?3
         WHERE id = ?1 AND invoice_id IS NULL",
        params![id, invoice_id, Utc::now().to_rfc3339()],
    )?;
    Ok(changed > 0)
}

/// Counts a client's jobs that reached completion (including the invoiced
/// and paid states downstream of it).
pub fn count_completed_for_client(
    conn: &Connection,
    client_id: &str,
) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM jobs
         WHERE client_id = ?1 AND status IN ('completed', 'invoiced', 'paid')",
        params![client_id],
        |r| r.get(0),
    )?;
    Ok(count)
}
