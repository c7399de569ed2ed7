//! Test harness: an in-memory database plus a fully wired engine, with a
//! captive notice outbox for asserting on outbound notices.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use fieldflow::db::job_repo::{self, JobRow};
use fieldflow::db::invoice_repo::{self, InvoiceRow};
use fieldflow::{
    Database, EngineSettings, JobState, LifecycleEngine, Notice, OutboxNotifier,
    TransitionRequest,
};

pub struct TestHarness {
    pub db: Database,
    pub engine: LifecycleEngine,
    pub notices: Receiver<Notice>,
}

impl TestHarness {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let (notifier, notices) = OutboxNotifier::new(64);
        let engine = LifecycleEngine::new(
            db.clone(),
            EngineSettings {
                invoice_prefix: "INV".to_string(),
                lock_timeout: Duration::from_secs(2),
            },
        )
        .with_notifier(Arc::new(notifier));

        Self {
            db,
            engine,
            notices,
        }
    }

    /// Shorthand for a plain transition by the test actor.
    pub fn transition(
        &self,
        job_id: &str,
        to: JobState,
    ) -> Result<fieldflow::TransitionOutcome, fieldflow::TransitionError> {
        self.engine.transition(job_id, TransitionRequest::new(to, "tester"))
    }

    pub fn job(&self, job_id: &str) -> JobRow {
        self.db
            .with_conn(|conn| Ok(job_repo::find_by_id(conn, job_id)?.unwrap()))
            .unwrap()
    }

    pub fn job_status(&self, job_id: &str) -> String {
        self.job(job_id).status
    }

    pub fn invoice(&self, invoice_id: &str) -> InvoiceRow {
        self.db
            .with_conn(|conn| Ok(invoice_repo::find_by_id(conn, invoice_id)?.unwrap()))
            .unwrap()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }
}
