//! Outbound notices and reminders.
//!
//! Delivery (email, SMS, push) is out of scope; these traits are the seam.
//! The shipped [`OutboxNotifier`] hands notices to a bounded channel that a
//! delivery process drains. Both collaborators are fire-and-forget: the
//! lifecycle never waits on them and never fails because of them.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;

/// A notice for a crew member or customer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A crew member was put on a scheduled job.
    CrewAssignment {
        job_id: String,
        worker: String,
        scheduled_date: String,
    },
    /// A crew member's job was cancelled.
    CrewStandDown { job_id: String, worker: String },
    /// The customer's job was cancelled.
    CustomerCancellation { job_id: String, client_id: String },
}

/// Sends notices to crews and customers.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Schedules payment reminders for an issued invoice.
pub trait ReminderScheduler: Send + Sync {
    fn schedule_payment_reminders(&self, invoice_id: &str, invoice_number: &str, client_id: &str);
}

/// Notifier backed by a bounded outbox channel.
///
/// A full or disconnected outbox drops the notice with a warning — notices
/// are best-effort and must never back-pressure a state transition.
pub struct OutboxNotifier {
    sender: Sender<Notice>,
}

impl OutboxNotifier {
    /// Creates the notifier and the receiving end for the delivery process.
    pub fn new(capacity: usize) -> (Self, Receiver<Notice>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(e) = self.sender.try_send(notice) {
            log::warn!("Dropping notice, outbox unavailable: {e}");
        }
    }
}

/// Notifier that discards everything. For tests and headless tools.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// Reminder scheduler that only records intent in the log. Stands in until
/// a real scheduling backend is wired up.
pub struct LogReminderScheduler;

impl ReminderScheduler for LogReminderScheduler {
    fn schedule_payment_reminders(&self, invoice_id: &str, invoice_number: &str, client_id: &str) {
        log::info!(
            "Payment reminders scheduled for invoice {invoice_number} ({invoice_id}) to client {client_id}"
        );
    }
}
