//! Post-commit automation, keyed by destination state.
//!
//! Every trigger runs inside its own error boundary: a failure is logged
//! and swallowed, never propagated, because the state transition it
//! follows is already committed. Triggers are also written to tolerate
//! running twice (crash-and-retry), hence the existing-invoice check and
//! the stamp-if-null writes.

use crate::db::job_repo::JobRow;
use crate::db::{client_repo, invoice_repo, job_repo};
use crate::db::DatabaseError;
use crate::invoicing;
use crate::notify::Notice;

use super::orchestrator::LifecycleEngine;
use super::state::JobState;

/// Runs the automation for the state the job just arrived in, and returns
/// the job row including any fields the automation stamped.
pub(crate) fn run(engine: &LifecycleEngine, job: JobRow, to: JobState) -> JobRow {
    match to {
        JobState::Scheduled => {
            boundary("crew notices", || notify_crew_scheduled(engine, &job));
            job
        }
        JobState::InProgress => {
            boundary("work start stamp", || stamp_work_start(engine, &job));
            refresh(engine, job)
        }
        JobState::Completed => {
            boundary("invoice synthesis", || synthesize_invoice(engine, &job));
            boundary("client category upgrade", || upgrade_client(engine, &job));
            refresh(engine, job)
        }
        JobState::Invoiced => {
            boundary("invoice send", || mark_invoice_sent(engine, &job));
            job
        }
        JobState::Paid => {
            boundary("invoice paid stamp", || mark_invoice_paid(engine, &job));
            job
        }
        JobState::Cancelled => {
            boundary("client category downgrade", || downgrade_client(engine, &job));
            boundary("cancellation notices", || notify_cancelled(engine, &job));
            job
        }
        JobState::Draft
        | JobState::NeedsPermit
        | JobState::WaitingOnClient
        | JobState::EnRoute
        | JobState::OnSite
        | JobState::WeatherHold => job,
    }
}

fn boundary<F>(label: &str, f: F)
where
    F: FnOnce() -> Result<(), DatabaseError>,
{
    if let Err(e) = f() {
        log::error!("Automation '{label}' failed: {e}");
    }
}

fn refresh(engine: &LifecycleEngine, job: JobRow) -> JobRow {
    match engine.db.with_conn(|conn| job_repo::find_by_id(conn, &job.id)) {
        Ok(Some(fresh)) => fresh,
        Ok(None) => {
            log::error!("Job {} vanished while running automation", job.id);
            job
        }
        Err(e) => {
            log::error!("Could not reload job {} after automation: {e}", job.id);
            job
        }
    }
}

fn notify_crew_scheduled(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    let date = job.scheduled_date.clone().unwrap_or_default();
    for worker in job.crew()? {
        engine.notifier.notify(Notice::CrewAssignment {
            job_id: job.id.clone(),
            worker,
            scheduled_date: date.clone(),
        });
    }
    Ok(())
}

fn stamp_work_start(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    if job.work_start_time.is_some() {
        return Ok(());
    }
    let now = chrono::Utc::now().to_rfc3339();
    engine.db.with_conn(|conn| {
        if job_repo::stamp_work_start(conn, &job.id, &now)? {
            log::info!("Stamped work start for job {}", job.id);
        }
        Ok(())
    })
}

fn synthesize_invoice(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    invoicing::ensure_invoice(
        &engine.db,
        job,
        &engine.settings.invoice_prefix,
        engine.settings.lock_timeout,
        engine.reminders.as_ref(),
    )?;
    Ok(())
}

fn upgrade_client(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    engine.db.with_conn(|conn| {
        if client_repo::set_category(conn, &job.client_id, client_repo::CATEGORY_ACTIVE)? {
            log::info!(
                "Client {} upgraded to {} after first completed job",
                job.client_id,
                client_repo::CATEGORY_ACTIVE
            );
        }
        Ok(())
    })
}

fn downgrade_client(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    engine.db.with_conn(|conn| {
        let completed = job_repo::count_completed_for_client(conn, &job.client_id)?;
        if completed == 0
            && client_repo::set_category(conn, &job.client_id, client_repo::CATEGORY_POTENTIAL)?
        {
            log::info!(
                "Client {} downgraded to {} after cancellation",
                job.client_id,
                client_repo::CATEGORY_POTENTIAL
            );
        }
        Ok(())
    })
}

fn mark_invoice_sent(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    // The invoiced-state guard already proved the link resolves.
    let Some(invoice_id) = &job.invoice_id else {
        log::warn!("Job {} reached invoiced with no linked invoice", job.id);
        return Ok(());
    };
    engine
        .db
        .with_conn(|conn| invoice_repo::mark_sent(conn, invoice_id))
}

fn mark_invoice_paid(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    let Some(invoice_id) = &job.invoice_id else {
        log::warn!("Job {} reached paid with no linked invoice", job.id);
        return Ok(());
    };
    let paid_at = job
        .payment_received_at
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
    engine
        .db
        .with_conn(|conn| invoice_repo::mark_paid(conn, invoice_id, &paid_at))
}

fn notify_cancelled(engine: &LifecycleEngine, job: &JobRow) -> Result<(), DatabaseError> {
    for worker in job.crew()? {
        engine.notifier.notify(Notice::CrewStandDown {
            job_id: job.id.clone(),
            worker,
        });
    }
    engine.notifier.notify(Notice::CustomerCancellation {
        job_id: job.id.clone(),
        client_id: job.client_id.clone(),
    });
    Ok(())
}
