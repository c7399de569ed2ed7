//! Event broadcasting for downstream consumers.

pub mod domain_events;

pub use domain_events::{
    DomainEvent, DomainEventKind, EventBroadcaster, JobSnapshot, TransitionSummary,
};
