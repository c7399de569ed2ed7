//! Domain events published after committed transitions.
//!
//! Only four states are externally visible as events; the rest of the
//! lifecycle is internal bookkeeping. Payloads carry an enriched snapshot
//! (client, property, quote pricing) so consumers do not need a second
//! fetch.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::job_repo::JobRow;
use crate::db::{client_repo, quote_repo, DatabaseError};
use crate::lifecycle::state::JobState;

/// Externally visible event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEventKind {
    JobScheduled,
    JobStarted,
    JobCompleted,
    JobCancelled,
}

impl DomainEventKind {
    /// The event a destination state maps to, if any.
    pub fn for_state(state: JobState) -> Option<Self> {
        match state {
            JobState::Scheduled => Some(DomainEventKind::JobScheduled),
            JobState::InProgress => Some(DomainEventKind::JobStarted),
            JobState::Completed => Some(DomainEventKind::JobCompleted),
            JobState::Cancelled => Some(DomainEventKind::JobCancelled),
            _ => None,
        }
    }
}

/// The transition that caused an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSummary {
    pub from: Option<String>,
    pub to: String,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub id: String,
    pub address: String,
}

/// Pricing fields from the linked quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePricing {
    pub id: String,
    pub selected_total_cents: i64,
    pub stump_grinding_cents: i64,
    pub addon_cents: i64,
    pub discount_percent: f64,
    pub discount_cents: i64,
    pub tax_rate_percent: f64,
}

/// Job state carried on an event, enriched with related aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    pub assigned_crew: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuotePricing>,
}

/// One published domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub kind: DomainEventKind,
    pub job: JobSnapshot,
    pub transition: TransitionSummary,
    pub timestamp: DateTime<Utc>,
}

/// Builds the enriched snapshot for a job row.
pub fn snapshot(conn: &Connection, job: &JobRow) -> Result<JobSnapshot, DatabaseError> {
    let client = client_repo::find_client(conn, &job.client_id)?.map(|c| ClientSummary {
        id: c.id,
        name: c.name,
        email: c.email,
        category: c.category,
    });

    let property = match &job.property_id {
        Some(property_id) => {
            client_repo::find_property(conn, property_id)?.map(|p| PropertySummary {
                id: p.id,
                address: p.address,
            })
        }
        None => None,
    };

    let quote = match &job.quote_id {
        Some(quote_id) => match quote_repo::find_by_id(conn, quote_id)? {
            Some(q) => {
                let selected_total_cents = q
                    .items()?
                    .iter()
                    .filter(|i| i.selected)
                    .map(|i| i.amount_cents)
                    .sum();
                Some(QuotePricing {
                    id: q.id,
                    selected_total_cents,
                    stump_grinding_cents: q.stump_grinding_cents,
                    addon_cents: q.addon_cents,
                    discount_percent: q.discount_percent,
                    discount_cents: q.discount_cents,
                    tax_rate_percent: q.tax_rate_percent,
                })
            }
            None => None,
        },
        None => None,
    };

    Ok(JobSnapshot {
        job_id: job.id.clone(),
        status: job.status.clone(),
        scheduled_date: job.scheduled_date.clone(),
        assigned_crew: job.crew()?,
        invoice_id: job.invoice_id.clone(),
        client,
        property,
        quote,
    })
}

/// Fan-out sender for domain events.
///
/// Emission is best-effort: an event with no subscribers is simply gone,
/// and a lagging subscriber misses events rather than slowing the
/// lifecycle down.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: DomainEvent) {
        match self.sender.send(event) {
            Ok(receivers) => log::debug!("Domain event delivered to {receivers} subscribers"),
            Err(_) => log::debug!("Domain event emitted with no subscribers"),
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
