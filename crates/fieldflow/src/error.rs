use thiserror::Error;

use crate::db::DatabaseError;
use crate::lifecycle::state::{JobState, UnknownState};

#[derive(Error, Debug)]
pub enum FieldflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),
}

pub type Result<T> = std::result::Result<T, FieldflowError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Why a transition attempt did not change the job.
#[derive(Error, Debug)]
pub enum TransitionError {
    /// No job with the given id.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The transition is not an edge of the state graph.
    #[error("Transition from {from} to {to} is not allowed")]
    NotAllowed { from: JobState, to: JobState },

    /// Topologically legal, but business preconditions are unmet.
    #[error("Transition blocked: {}", reasons.join("; "))]
    Blocked { reasons: Vec<String> },

    /// The stored `status` column holds something outside the state set.
    #[error("Job '{id}' has an invalid stored status: {source}")]
    InvalidStoredState {
        id: String,
        #[source]
        source: UnknownState,
    },

    /// Store-level failure; the transaction rolled back.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TransitionError {
    /// Every unmet precondition as a displayable list. Single-cause errors
    /// yield a one-element list so callers can treat all rejections alike.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            TransitionError::Blocked { reasons } => reasons.clone(),
            other => vec![other.to_string()],
        }
    }

    /// Whether the caller may simply retry. True only for contention-style
    /// store failures, where nothing was committed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransitionError::Database(e) if e.is_retryable())
    }
}
