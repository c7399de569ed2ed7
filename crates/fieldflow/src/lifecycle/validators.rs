//! Business preconditions per destination state.
//!
//! Each guard returns *every* unmet precondition, not just the first, so a
//! caller can show the whole list at once. The strings are surfaced to
//! users verbatim. Topological legality is checked separately by the
//! transition table; guards assume it already passed.

use rusqlite::Connection;

use crate::db::{form_repo, invoice_repo, DatabaseError};
use crate::db::job_repo::JobRow;

use super::state::JobState;

/// Runs the guard for the destination state. An empty list means the
/// transition may proceed.
pub fn validate(
    job: &JobRow,
    to: JobState,
    conn: &Connection,
) -> Result<Vec<String>, DatabaseError> {
    let mut errors = Vec::new();
    match to {
        JobState::Scheduled => {
            require_schedulable(job, &mut errors)?;
            if job.permit_required && job.permit_status.as_deref() != Some("approved") {
                errors.push(format!(
                    "Permit is required but not approved (status: {})",
                    job.permit_status.as_deref().unwrap_or("none")
                ));
            }
            if job.deposit_required
                && !matches!(job.deposit_status.as_deref(), Some("received") | Some("waived"))
            {
                errors.push(format!(
                    "Deposit is required but not received or waived (status: {})",
                    job.deposit_status.as_deref().unwrap_or("none")
                ));
            }
        }
        JobState::InProgress => {
            require_schedulable(job, &mut errors)?;
            if job.jha_required {
                if job.jha.as_deref().map_or(true, str::is_empty) {
                    errors.push("Job hazard analysis is required but missing".to_string());
                }
                if job.jha_acknowledged_at.is_none() {
                    errors.push("Job hazard analysis has not been acknowledged".to_string());
                }
            }
            let incomplete = form_repo::incomplete_for_job(conn, &job.id)?;
            if !incomplete.is_empty() {
                errors.push(format!("Forms not completed: {}", incomplete.join(", ")));
            }
        }
        JobState::Completed => {
            if job.work_start_time.is_none() {
                errors.push("Work has not been started".to_string());
            }
            if job.work_end_time.is_none() {
                errors.push("Work end time is not set".to_string());
            }
            let unchecked: Vec<String> = job
                .checklist()?
                .into_iter()
                .filter(|item| !item.checked)
                .map(|item| item.item)
                .collect();
            if !unchecked.is_empty() {
                errors.push(format!(
                    "Completion checklist has unchecked items: {}",
                    unchecked.join(", ")
                ));
            }
        }
        JobState::Invoiced => match &job.invoice_id {
            None => errors.push("No invoice linked to this job".to_string()),
            Some(invoice_id) => {
                if !invoice_repo::exists(conn, invoice_id)? {
                    errors.push(format!("Linked invoice '{invoice_id}' does not exist"));
                }
            }
        },
        JobState::Paid => {
            if job.payment_received_at.is_none() {
                errors.push("No payment received yet".to_string());
            }
            if job.invoice_id.is_none() {
                errors.push("No invoice linked to this job".to_string());
            }
        }
        JobState::NeedsPermit => {
            if !job.permit_required {
                errors.push("Job does not require a permit".to_string());
            }
        }
        JobState::WeatherHold => {
            if job
                .weather_hold_reason
                .as_deref()
                .map_or(true, str::is_empty)
            {
                errors.push("No weather hold reason provided".to_string());
            }
        }
        JobState::EnRoute | JobState::OnSite => {
            require_schedulable(job, &mut errors)?;
        }
        // Topological legality is the only requirement for these.
        JobState::Draft | JobState::WaitingOnClient | JobState::Cancelled => {}
    }
    Ok(errors)
}

/// Shared precondition for states that put a crew on the road.
fn require_schedulable(job: &JobRow, errors: &mut Vec<String>) -> Result<(), DatabaseError> {
    if job.scheduled_date.as_deref().map_or(true, str::is_empty) {
        errors.push("No scheduled date set".to_string());
    }
    if job.crew()?.is_empty() {
        errors.push("No crew assigned".to_string());
    }
    Ok(())
}
