//! The legal transition graph.
//!
//! This table is the single source of truth for topology. Validators layer
//! business preconditions on top; nothing here reads the database.
//!
//! Topology notes: every non-terminal state except `completed` can reach
//! `cancelled` directly. A completed job must be invoiced first and voided
//! from there, so the work record and the money record stay consistent.

use super::state::JobState;

/// States reachable from `from` in one step.
pub fn allowed_transitions(from: JobState) -> &'static [JobState] {
    use JobState::*;
    match from {
        Draft => &[NeedsPermit, WaitingOnClient, Scheduled, Cancelled],
        NeedsPermit => &[Draft, WaitingOnClient, Scheduled, Cancelled],
        WaitingOnClient => &[Draft, NeedsPermit, Scheduled, Cancelled],
        Scheduled => &[WaitingOnClient, EnRoute, WeatherHold, InProgress, Cancelled],
        EnRoute => &[OnSite, WeatherHold, Cancelled],
        OnSite => &[InProgress, WeatherHold, Cancelled],
        WeatherHold => &[Scheduled, EnRoute, Cancelled],
        InProgress => &[WeatherHold, Completed, Cancelled],
        Completed => &[Invoiced],
        Invoiced => &[Paid, Cancelled],
        Paid => &[],
        Cancelled => &[],
    }
}

/// Pure topology lookup; business preconditions are the validators' job.
pub fn is_transition_allowed(from: JobState, to: JobState) -> bool {
    allowed_transitions(from).contains(&to)
}
