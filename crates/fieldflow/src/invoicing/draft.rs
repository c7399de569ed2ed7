//! Draft invoice synthesis for completed jobs.
//!
//! Runs as post-commit automation, so it is written to tolerate
//! at-least-once execution: an already-linked invoice short-circuits, and
//! the invoice insert plus the job link share one transaction.

use std::time::Duration;

use chrono::{Datelike, Utc};
use rusqlite::Transaction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::job_repo::JobRow;
use crate::db::{client_repo, invoice_repo, job_repo, quote_repo, Database, DatabaseError};
use crate::db::invoice_repo::InvoiceRow;
use crate::db::quote_repo::QuoteRow;
use crate::notify::ReminderScheduler;

use super::numbering;

/// One billed line on a draft invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceLineItem {
    pub description: String,
    pub amount_cents: i64,
}

/// Creates and links a draft invoice for a completed job, unless one is
/// already linked. Returns the created invoice, or `None` when the job
/// already had one.
pub fn ensure_invoice(
    db: &Database,
    job: &JobRow,
    prefix: &str,
    lock_timeout: Duration,
    reminders: &dyn ReminderScheduler,
) -> Result<Option<InvoiceRow>, DatabaseError> {
    if job.invoice_id.is_some() {
        log::debug!("Job {} already has an invoice, skipping synthesis", job.id);
        return Ok(None);
    }

    let locks = db.locks();
    let year = Utc::now().year();

    let created = db.with_tx(|tx| {
        // Re-read inside the transaction: a retry of this automation may
        // have linked an invoice since the caller loaded the job.
        let current = job_repo::find_by_id(tx, &job.id)?;
        let current = match current {
            Some(row) if row.invoice_id.is_none() => row,
            _ => return Ok(None),
        };

        // The year lock stays held until `sequence` drops at the end of
        // this closure, which is after our insert — the next allocator
        // scan sees this number.
        let sequence = numbering::allocate(tx, locks, prefix, year, lock_timeout);

        let invoice = build_invoice(tx, &current, sequence.number())?;
        let invoice = match insert_with_number(tx, invoice) {
            InsertOutcome::Inserted(invoice) => invoice,
            InsertOutcome::NumberTaken(mut invoice) if sequence.is_fallback() => {
                // A fallback number can collide with another fallback from
                // the same instant. One fresh fallback, then give up and
                // let the next automation run retry the whole synthesis.
                log::warn!(
                    "Fallback invoice number {} already taken, retrying once",
                    invoice.invoice_number
                );
                invoice.invoice_number = numbering::fallback_number(prefix, year);
                match insert_with_number(tx, invoice) {
                    InsertOutcome::Inserted(invoice) => invoice,
                    InsertOutcome::NumberTaken(invoice) => {
                        return Err(DatabaseError::Sqlite(taken_error(&invoice.invoice_number)));
                    }
                    InsertOutcome::Failed(e) => return Err(e),
                }
            }
            // A sequence-derived collision means the year lock failed at
            // its one job; surface it rather than papering over.
            InsertOutcome::NumberTaken(invoice) => {
                return Err(DatabaseError::Sqlite(taken_error(&invoice.invoice_number)));
            }
            InsertOutcome::Failed(e) => return Err(e),
        };

        job_repo::link_invoice(tx, &current.id, &invoice.id)?;
        Ok(Some(invoice))
    })?;

    if let Some(invoice) = &created {
        log::info!(
            "Drafted invoice {} ({}) for job {}",
            invoice.invoice_number,
            invoice.id,
            job.id
        );
        reminders.schedule_payment_reminders(&invoice.id, &invoice.invoice_number, &invoice.client_id);
    }

    Ok(created)
}

enum InsertOutcome {
    Inserted(InvoiceRow),
    NumberTaken(InvoiceRow),
    Failed(DatabaseError),
}

fn insert_with_number(tx: &Transaction<'_>, invoice: InvoiceRow) -> InsertOutcome {
    match invoice_repo::insert(tx, &invoice) {
        Ok(()) => InsertOutcome::Inserted(invoice),
        Err(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            InsertOutcome::NumberTaken(invoice)
        }
        Err(e) => InsertOutcome::Failed(e),
    }
}

fn taken_error(number: &str) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
        Some(format!("invoice number '{number}' already exists")),
    )
}

/// Assembles the invoice row: billing contact from the client/property,
/// line items and totals from the linked quote.
fn build_invoice(
    tx: &Transaction<'_>,
    job: &JobRow,
    number: &str,
) -> Result<InvoiceRow, DatabaseError> {
    let client =
        client_repo::find_client(tx, &job.client_id)?.ok_or(DatabaseError::Corrupt {
            table: "jobs",
            column: "client_id",
            id: job.id.clone(),
            reason: format!("client '{}' not found", job.client_id),
        })?;

    let property = match &job.property_id {
        Some(property_id) => client_repo::find_property(tx, property_id)?,
        None => None,
    };
    let billing_address = client
        .billing_address
        .clone()
        .or_else(|| property.map(|p| p.address));

    let (line_items, totals) = match &job.quote_id {
        Some(quote_id) => match quote_repo::find_by_id(tx, quote_id)? {
            Some(quote) => billed_items(&quote)?,
            None => {
                log::warn!("Job {} references missing quote {quote_id}", job.id);
                (Vec::new(), Totals::default())
            }
        },
        None => (Vec::new(), Totals::default()),
    };

    let line_items_json =
        serde_json::to_string(&line_items).map_err(|e| DatabaseError::Corrupt {
            table: "invoices",
            column: "line_items",
            id: job.id.clone(),
            reason: e.to_string(),
        })?;

    Ok(InvoiceRow {
        id: Uuid::new_v4().to_string(),
        job_id: job.id.clone(),
        client_id: job.client_id.clone(),
        invoice_number: number.to_string(),
        status: invoice_repo::STATUS_DRAFT.to_string(),
        billing_name: Some(client.name),
        billing_email: client.email,
        billing_address,
        line_items: line_items_json,
        subtotal_cents: totals.subtotal,
        discount_cents: totals.discount,
        tax_cents: totals.tax,
        total_cents: totals.total,
        issued_at: None,
        paid_at: None,
        created_at: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Totals {
    subtotal: i64,
    discount: i64,
    tax: i64,
    total: i64,
}

/// Selected quote items plus the stump-grinding and add-on charges, with
/// subtotal -> discount -> tax -> total in integer cents.
fn billed_items(quote: &QuoteRow) -> Result<(Vec<InvoiceLineItem>, Totals), DatabaseError> {
    let mut items: Vec<InvoiceLineItem> = quote
        .items()?
        .into_iter()
        .filter(|item| item.selected)
        .map(|item| InvoiceLineItem {
            description: item.description,
            amount_cents: item.amount_cents,
        })
        .collect();

    if quote.stump_grinding_cents > 0 {
        items.push(InvoiceLineItem {
            description: "Stump grinding".to_string(),
            amount_cents: quote.stump_grinding_cents,
        });
    }
    if quote.addon_cents > 0 {
        items.push(InvoiceLineItem {
            description: "Add-on charges".to_string(),
            amount_cents: quote.addon_cents,
        });
    }

    let subtotal: i64 = items.iter().map(|i| i.amount_cents).sum();
    let percent_off = (subtotal as f64 * quote.discount_percent / 100.0).round() as i64;
    let discount = (percent_off + quote.discount_cents).min(subtotal);
    let taxable = subtotal - discount;
    let tax = (taxable as f64 * quote.tax_rate_percent / 100.0).round() as i64;

    Ok((
        items,
        Totals {
            subtotal,
            discount,
            tax,
            total: taxable + tax,
        },
    ))
}
