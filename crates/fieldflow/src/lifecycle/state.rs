//! The job state set.

use serde::{Deserialize, Serialize};

/// Operational state of a job.
///
/// `Paid` and `Cancelled` are terminal. The `status` column stores the
/// snake_case form returned by [`JobState::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Draft,
    NeedsPermit,
    WaitingOnClient,
    Scheduled,
    EnRoute,
    OnSite,
    WeatherHold,
    InProgress,
    Completed,
    Invoiced,
    Paid,
    Cancelled,
}

/// Every state, in lifecycle order. Useful for exhaustive sweeps in the
/// allowed-transitions reader and in tests.
pub const ALL_STATES: &[JobState] = &[
    JobState::Draft,
    JobState::NeedsPermit,
    JobState::WaitingOnClient,
    JobState::Scheduled,
    JobState::EnRoute,
    JobState::OnSite,
    JobState::WeatherHold,
    JobState::InProgress,
    JobState::Completed,
    JobState::Invoiced,
    JobState::Paid,
    JobState::Cancelled,
];

impl JobState {
    /// The stored (snake_case) form.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Draft => "draft",
            JobState::NeedsPermit => "needs_permit",
            JobState::WaitingOnClient => "waiting_on_client",
            JobState::Scheduled => "scheduled",
            JobState::EnRoute => "en_route",
            JobState::OnSite => "on_site",
            JobState::WeatherHold => "weather_hold",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Invoiced => "invoiced",
            JobState::Paid => "paid",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Human-readable name for display surfaces.
    pub fn display_name(&self) -> &'static str {
        match self {
            JobState::Draft => "Draft",
            JobState::NeedsPermit => "Needs Permit",
            JobState::WaitingOnClient => "Waiting on Client",
            JobState::Scheduled => "Scheduled",
            JobState::EnRoute => "En Route",
            JobState::OnSite => "On Site",
            JobState::WeatherHold => "Weather Hold",
            JobState::InProgress => "In Progress",
            JobState::Completed => "Completed",
            JobState::Invoiced => "Invoiced",
            JobState::Paid => "Paid",
            JobState::Cancelled => "Cancelled",
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Paid | JobState::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JobState::Draft),
            "needs_permit" => Ok(JobState::NeedsPermit),
            "waiting_on_client" => Ok(JobState::WaitingOnClient),
            "scheduled" => Ok(JobState::Scheduled),
            "en_route" => Ok(JobState::EnRoute),
            "on_site" => Ok(JobState::OnSite),
            "weather_hold" => Ok(JobState::WeatherHold),
            "in_progress" => Ok(JobState::InProgress),
            "completed" => Ok(JobState::Completed),
            "invoiced" => Ok(JobState::Invoiced),
            "paid" => Ok(JobState::Paid),
            "cancelled" => Ok(JobState::Cancelled),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// A `status` value that is not one of the defined states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job state '{0}'")]
pub struct UnknownState(pub String);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_round_trip_all_states() {
        for state in ALL_STATES {
            assert_eq!(JobState::from_str(state.as_str()).unwrap(), *state);
        }
    }

    #[test]
    fn test_unknown_state_rejected() {
        assert!(JobState::from_str("exploded").is_err());
        assert!(JobState::from_str("Scheduled").is_err());
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = ALL_STATES.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&JobState::Paid, &JobState::Cancelled]);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&JobState::WeatherHold).unwrap();
        assert_eq!(json, "\"weather_hold\"");
        let back: JobState = serde_json::from_str("\"en_route\"").unwrap();
        assert_eq!(back, JobState::EnRoute);
    }
}
