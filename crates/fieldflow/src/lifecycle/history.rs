//! Read side of the lifecycle: the audit log and a dry-run of what a job
//! could do next. Independent of the write path — nothing here takes
//! locks or opens write transactions.

use serde::Serialize;

use crate::db::transition_repo::TransitionRow;
use crate::db::{job_repo, transition_repo, Database};
use crate::error::TransitionError;

use super::state::JobState;
use super::{table, validators};

/// One potential next state, with the reasons it is currently blocked
/// (empty when `allowed`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOption {
    pub state: JobState,
    pub display_name: &'static str,
    pub allowed: bool,
    pub blocked_reasons: Vec<String>,
}

/// What a job can do next, for action menus and API clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOptions {
    pub current_state: JobState,
    pub options: Vec<TransitionOption>,
}

/// A job's transitions, newest first.
pub fn history(db: &Database, job_id: &str) -> Result<Vec<TransitionRow>, TransitionError> {
    db.with_conn(|conn| transition_repo::history_for_job(conn, job_id))
        .map_err(TransitionError::Database)
}

/// Re-runs every validator against every topologically-reachable state so
/// a caller can see which actions are available and why the rest are not,
/// without attempting a real transition.
pub fn allowed_transitions_for(
    db: &Database,
    job_id: &str,
) -> Result<TransitionOptions, TransitionError> {
    let (job, current) = db
        .with_conn(|conn| job_repo::find_by_id(conn, job_id))
        .map_err(TransitionError::Database)?
        .ok_or_else(|| TransitionError::JobNotFound(job_id.to_string()))
        .and_then(|job| {
            let current: JobState =
                job.status
                    .parse()
                    .map_err(|e| TransitionError::InvalidStoredState {
                        id: job.id.clone(),
                        source: e,
                    })?;
            Ok((job, current))
        })?;

    let options = db
        .with_conn(|conn| {
            table::allowed_transitions(current)
                .iter()
                .map(|state| {
                    let blocked_reasons = validators::validate(&job, *state, conn)?;
                    Ok(TransitionOption {
                        state: *state,
                        display_name: state.display_name(),
                        allowed: blocked_reasons.is_empty(),
                        blocked_reasons,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(TransitionError::Database)?;

    Ok(TransitionOptions {
        current_state: current,
        options,
    })
}
