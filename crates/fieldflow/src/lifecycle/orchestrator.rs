//! The transition orchestrator — the only sanctioned writer of `status`.
//!
//! A transition is: take the job's named lock, then in one transaction
//! load the row, check topology, apply the caller's extra field updates,
//! run the destination guard, persist the new status and the audit row.
//! Only after the commit do automation triggers and the domain event run,
//! so their failures can never undo or block a committed transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broadcast::domain_events::{self, DomainEvent, DomainEventKind, TransitionSummary};
use crate::broadcast::EventBroadcaster;
use crate::db::job_repo::{ChecklistItem, JobRow};
use crate::db::transition_repo::TransitionRow;
use crate::db::{job_repo, transition_repo, Database, DatabaseError};
use crate::error::TransitionError;
use crate::notify::{LogReminderScheduler, NoopNotifier, Notifier, ReminderScheduler};

use super::history::{self, TransitionOptions};
use super::state::JobState;
use super::{table, triggers, validators};

/// Where a transition originated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionSource {
    #[default]
    Manual,
    Automated,
    System,
}

impl TransitionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionSource::Manual => "manual",
            TransitionSource::Automated => "automated",
            TransitionSource::System => "system",
        }
    }
}

/// Extra job fields a caller may set atomically with a transition, e.g.
/// the weather-hold reason together with the move into `weather_hold`.
/// They are applied before validation, so the guard sees the final row.
#[derive(Debug, Default, Clone)]
pub struct JobUpdates {
    pub scheduled_date: Option<String>,
    pub assigned_crew: Option<Vec<String>>,
    pub jha: Option<String>,
    pub jha_acknowledged_at: Option<String>,
    pub permit_status: Option<String>,
    pub deposit_status: Option<String>,
    pub work_end_time: Option<String>,
    pub completion_checklist: Option<Vec<ChecklistItem>>,
    pub payment_received_at: Option<String>,
    pub weather_hold_reason: Option<String>,
}

impl JobUpdates {
    fn apply(&self, job: &mut JobRow) -> Result<(), DatabaseError> {
        if let Some(date) = &self.scheduled_date {
            job.scheduled_date = Some(date.clone());
        }
        if let Some(crew) = &self.assigned_crew {
            job.assigned_crew = encode_json(&job.id, "assigned_crew", crew)?;
        }
        if let Some(jha) = &self.jha {
            job.jha = Some(jha.clone());
        }
        if let Some(at) = &self.jha_acknowledged_at {
            job.jha_acknowledged_at = Some(at.clone());
        }
        if let Some(status) = &self.permit_status {
            job.permit_status = Some(status.clone());
        }
        if let Some(status) = &self.deposit_status {
            job.deposit_status = Some(status.clone());
        }
        if let Some(at) = &self.work_end_time {
            job.work_end_time = Some(at.clone());
        }
        if let Some(checklist) = &self.completion_checklist {
            job.completion_checklist = encode_json(&job.id, "completion_checklist", checklist)?;
        }
        if let Some(at) = &self.payment_received_at {
            job.payment_received_at = Some(at.clone());
        }
        if let Some(reason) = &self.weather_hold_reason {
            job.weather_hold_reason = Some(reason.clone());
        }
        Ok(())
    }
}

fn encode_json<T: Serialize>(
    job_id: &str,
    column: &'static str,
    value: &T,
) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Corrupt {
        table: "jobs",
        column,
        id: job_id.to_string(),
        reason: e.to_string(),
    })
}

/// A transition attempt.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub to: JobState,
    pub actor: String,
    pub actor_role: Option<String>,
    pub source: TransitionSource,
    pub reason: Option<String>,
    pub notes: Option<serde_json::Value>,
    pub updates: JobUpdates,
}

impl TransitionRequest {
    pub fn new(to: JobState, actor: impl Into<String>) -> Self {
        Self {
            to,
            actor: actor.into(),
            actor_role: None,
            source: TransitionSource::default(),
            reason: None,
            notes: None,
            updates: JobUpdates::default(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_source(mut self, source: TransitionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_updates(mut self, updates: JobUpdates) -> Self {
        self.updates = updates;
        self
    }
}

/// A committed transition: the job as persisted (including any fields the
/// automation pass stamped afterwards) and its audit record.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub job: JobRow,
    pub record: TransitionRow,
}

/// Fields for creating a job in its initial state.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub client_id: String,
    pub property_id: Option<String>,
    pub quote_id: Option<String>,
    pub jha_required: bool,
    pub permit_required: bool,
    pub deposit_required: bool,
    pub actor: String,
}

impl NewJob {
    pub fn for_client(client_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            property_id: None,
            quote_id: None,
            jha_required: false,
            permit_required: false,
            deposit_required: false,
            actor: actor.into(),
        }
    }
}

/// Engine tunables, typically taken from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Invoice number prefix, e.g. `INV`.
    pub invoice_prefix: String,
    /// Bound on waiting for the job lock and the invoice-year lock.
    pub lock_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            invoice_prefix: "INV".to_string(),
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// The job lifecycle engine. Cheap to clone; clones share the store, the
/// lock namespace, the event channel, and the collaborators.
#[derive(Clone)]
pub struct LifecycleEngine {
    pub(crate) db: Database,
    pub(crate) settings: EngineSettings,
    pub(crate) events: EventBroadcaster,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) reminders: Arc<dyn ReminderScheduler>,
}

impl LifecycleEngine {
    /// Creates an engine with no-op collaborators. Wire real ones with the
    /// `with_*` builders.
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        Self {
            db,
            settings,
            events: EventBroadcaster::default(),
            notifier: Arc::new(NoopNotifier),
            reminders: Arc::new(LogReminderScheduler),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_reminders(mut self, reminders: Arc<dyn ReminderScheduler>) -> Self {
        self.reminders = reminders;
        self
    }

    /// The domain-event stream; call `.subscribe()` for a receiver.
    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Moves a job to a new state.
    ///
    /// On success the returned job reflects any writes the automation pass
    /// made (work-start stamp, invoice link). All rejection reasons come
    /// back in the error; nothing is written on any rejection path.
    pub fn transition(
        &self,
        job_id: &str,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        let span = tracing::info_span!("transition", job = job_id, to = request.to.as_str());
        let _enter = span.enter();

        // Serializes transition attempts on this job; attempts on other
        // jobs proceed independently. Bounded, so contention surfaces as
        // a retryable error instead of a hang.
        let job_guard = self
            .db
            .locks()
            .acquire(&job_lock_name(job_id), self.settings.lock_timeout)
            .map_err(TransitionError::Database)?;

        let (job, record) = self.db.with_tx(|tx| {
            let mut job = job_repo::find_by_id(tx, job_id)?
                .ok_or_else(|| TransitionError::JobNotFound(job_id.to_string()))?;
            let from: JobState =
                job.status
                    .parse()
                    .map_err(|e| TransitionError::InvalidStoredState {
                        id: job.id.clone(),
                        source: e,
                    })?;

            if !table::is_transition_allowed(from, request.to) {
                return Err(TransitionError::NotAllowed {
                    from,
                    to: request.to,
                });
            }

            request.updates.apply(&mut job)?;

            let reasons = validators::validate(&job, request.to, tx)?;
            if !reasons.is_empty() {
                return Err(TransitionError::Blocked { reasons });
            }

            let now = Utc::now().to_rfc3339();
            job.status = request.to.as_str().to_string();
            job.last_state_change = Some(now.clone());
            job.updated_at = now.clone();
            job_repo::update(tx, &job)?;

            let record = TransitionRow {
                id: Uuid::new_v4().to_string(),
                job_id: job.id.clone(),
                from_state: Some(from.as_str().to_string()),
                to_state: request.to.as_str().to_string(),
                actor: request.actor.clone(),
                actor_role: request.actor_role.clone(),
                source: request.source.as_str().to_string(),
                reason: request.reason.clone(),
                notes: request.notes.as_ref().map(|n| n.to_string()),
                created_at: now,
            };
            transition_repo::insert(tx, &record)?;

            Ok((job, record))
        })?;

        // The commit is done; release the job lock before the best-effort
        // tail so automation cannot extend the mutual-exclusion window.
        drop(job_guard);

        log::info!(
            "Job {} transitioned {} -> {} by {}",
            job.id,
            record.from_state.as_deref().unwrap_or("(created)"),
            record.to_state,
            record.actor
        );

        let job = triggers::run(self, job, request.to);
        self.emit_event(&job, &record, request.to);

        Ok(TransitionOutcome { job, record })
    }

    /// Creates a job in `draft` together with its creation audit row
    /// (`from_state` NULL), in one transaction.
    pub fn create_job(&self, new_job: NewJob) -> Result<TransitionOutcome, TransitionError> {
        let now = Utc::now().to_rfc3339();
        let job = JobRow {
            id: Uuid::new_v4().to_string(),
            client_id: new_job.client_id,
            property_id: new_job.property_id,
            quote_id: new_job.quote_id,
            status: JobState::Draft.as_str().to_string(),
            last_state_change: Some(now.clone()),
            scheduled_date: None,
            assigned_crew: "[]".to_string(),
            jha_required: new_job.jha_required,
            jha: None,
            jha_acknowledged_at: None,
            permit_required: new_job.permit_required,
            permit_status: None,
            deposit_required: new_job.deposit_required,
            deposit_status: None,
            work_start_time: None,
            work_end_time: None,
            completion_checklist: "[]".to_string(),
            invoice_id: None,
            payment_received_at: None,
            weather_hold_reason: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let record = TransitionRow {
            id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            from_state: None,
            to_state: JobState::Draft.as_str().to_string(),
            actor: new_job.actor,
            actor_role: None,
            source: TransitionSource::System.as_str().to_string(),
            reason: None,
            notes: None,
            created_at: now,
        };

        self.db.with_tx(|tx| {
            job_repo::insert(tx, &job)?;
            transition_repo::insert(tx, &record)?;
            Ok::<_, TransitionError>(())
        })?;

        log::info!("Job {} created in draft for client {}", job.id, job.client_id);
        Ok(TransitionOutcome { job, record })
    }

    /// A job's transition log, newest first.
    pub fn history(&self, job_id: &str) -> Result<Vec<TransitionRow>, TransitionError> {
        history::history(&self.db, job_id)
    }

    /// Which states this job could move to right now, with the blocking
    /// reasons for the ones it cannot.
    pub fn allowed_transitions_for(
        &self,
        job_id: &str,
    ) -> Result<TransitionOptions, TransitionError> {
        history::allowed_transitions_for(&self.db, job_id)
    }

    fn emit_event(&self, job: &JobRow, record: &TransitionRow, to: JobState) {
        let Some(kind) = DomainEventKind::for_state(to) else {
            return;
        };

        let snapshot = self
            .db
            .with_conn(|conn| domain_events::snapshot(conn, job));
        match snapshot {
            Ok(snapshot) => self.events.emit(DomainEvent {
                kind,
                job: snapshot,
                transition: TransitionSummary {
                    from: record.from_state.clone(),
                    to: record.to_state.clone(),
                    actor: record.actor.clone(),
                    reason: record.reason.clone(),
                },
                timestamp: Utc::now(),
            }),
            Err(e) => log::error!("Skipping domain event for job {}: {e}", job.id),
        }
    }
}

pub(crate) fn job_lock_name(job_id: &str) -> String {
    format!("job/{job_id}")
}
