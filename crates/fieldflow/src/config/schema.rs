//! Configuration schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::EngineSettings;

/// Top-level configuration, loaded from `fieldflow.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Overrides the default `~/.fieldflow/data/fieldflow.db` location.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub invoicing: InvoicingConfig,
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl Config {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            invoice_prefix: self.invoicing.prefix.clone(),
            lock_timeout: Duration::from_millis(self.locks.timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            invoicing: InvoicingConfig::default(),
            locks: LockConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicingConfig {
    /// Invoice number prefix, e.g. `INV` in `INV-2026-0001`.
    pub prefix: String,
    /// Days after issue to send payment reminders on.
    pub reminder_days: Vec<u32>,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            prefix: "INV".to_string(),
            reminder_days: vec![7, 14, 30],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Bound on waiting for the job lock and the invoice-year lock.
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Bounded capacity of the notice outbox channel.
    pub outbox_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 256,
        }
    }
}
