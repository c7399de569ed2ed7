pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod invoicing;
pub mod lifecycle;
pub mod logging;
pub mod notify;

pub use broadcast::{DomainEvent, DomainEventKind, EventBroadcaster, JobSnapshot};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, FieldflowError, Result, TransitionError};
pub use lifecycle::{
    EngineSettings, JobState, JobUpdates, LifecycleEngine, NewJob, TransitionOutcome,
    TransitionRequest, TransitionSource,
};
pub use notify::{Notice, Notifier, OutboxNotifier, ReminderScheduler};
