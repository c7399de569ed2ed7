//! Invoice repository.
//!
//! The lifecycle core drafts invoices on completion and flips their status
//! on the invoiced/paid transitions. Rendering and delivery live elsewhere.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::DatabaseError;

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_SENT: &str = "sent";
pub const STATUS_PAID: &str = "paid";

/// An invoice row. Amounts are integer cents.
#[derive(Debug, Clone)]
pub struct InvoiceRow {
    pub id: String,
    pub job_id: String,
    pub client_id: String,
    pub invoice_number: String,
    pub status: String,
    pub billing_name: Option<String>,
    pub billing_email: Option<String>,
    pub billing_address: Option<String>,
    /// JSON array of billed line items.
    pub line_items: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub issued_at: Option<String>,
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl InvoiceRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            client_id: row.get("client_id")?,
            invoice_number: row.get("invoice_number")?,
            status: row.get("status")?,
            billing_name: row.get("billing_name")?,
            billing_email: row.get("billing_email")?,
            billing_address: row.get("billing_address")?,
            line_items: row.get("line_items")?,
            subtotal_cents: row.get("subtotal_cents")?,
            discount_cents: row.get("discount_cents")?,
            tax_cents: row.get("tax_cents")?,
            total_cents: row.get("total_cents")?,
            issued_at: row.get("issued_at")?,
            paid_at: row.get("paid_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn insert(conn: &Connection, invoice: &InvoiceRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO invoices (id, job_id, client_id, invoice_number, status,
         billing_name, billing_email, billing_address, line_items,
         subtotal_cents, discount_cents, tax_cents, total_cents,
         issued_at, paid_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            invoice.id,
            invoice.job_id,
            invoice.client_id,
            invoice.invoice_number,
            invoice.status,
            invoice.billing_name,
            invoice.billing_email,
            invoice.billing_address,
            invoice.line_items,
            invoice.subtotal_cents,
            invoice.discount_cents,
            invoice.tax_cents,
            invoice.total_cents,
            invoice.issued_at,
            invoice.paid_at,
            invoice.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<InvoiceRow>, DatabaseError> {
    conn.query_row("SELECT * FROM invoices WHERE id = ?1", params![id], |row| {
        InvoiceRow::from_row(row)
    })
    .optional()
    .map_err(DatabaseError::Sqlite)
}

pub fn exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM invoices WHERE id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Marks an invoice as sent, stamping `issued_at` on first send.
pub fn mark_sent(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE invoices SET status = ?2, issued_at = COALESCE(issued_at, ?3) WHERE id = ?1",
        params![id, STATUS_SENT, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Marks an invoice as paid, stamping `paid_at`.
pub fn mark_paid(conn: &Connection, id: &str, paid_at: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE invoices SET status = ?2, paid_at = ?3 WHERE id = ?1",
        params![id, STATUS_PAID, paid_at],
    )?;
    Ok(())
}

/// Returns every invoice number starting with the given prefix
/// (e.g. `INV-2026-`). The allocator extracts and ranks the numeric
/// suffixes itself.
pub fn numbers_with_prefix(
    conn: &Connection,
    prefix: &str,
) -> Result<Vec<String>, DatabaseError> {
    // LIKE special characters never appear in a sane prefix, but escape
    // them so a misconfigured one cannot widen the scan.
    let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    let mut stmt = conn.prepare(
        "SELECT invoice_number FROM invoices WHERE invoice_number LIKE ?1 ESCAPE '\\'",
    )?;
    let rows = stmt
        .query_map(params![format!("{escaped}%")], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO clients (id, name, category, created_at, updated_at)
             VALUES ('c1', 'Test', 'potential', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');
             INSERT INTO jobs (id, client_id, status, created_at, updated_at)
             VALUES ('j1', 'c1', 'completed', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');",
        )
        .unwrap();
    }

    fn sample_invoice(id: &str, number: &str) -> InvoiceRow {
        InvoiceRow {
            id: id.to_string(),
            job_id: "j1".to_string(),
            client_id: "c1".to_string(),
            invoice_number: number.to_string(),
            status: STATUS_DRAFT.to_string(),
            billing_name: None,
            billing_email: None,
            billing_address: None,
            line_items: "[]".to_string(),
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            issued_at: None,
            paid_at: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_status_progression() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            seed(conn);
            insert(conn, &sample_invoice("i1", "INV-2026-0001"))?;

            mark_sent(conn, "i1")?;
            let sent = find_by_id(conn, "i1")?.unwrap();
            assert_eq!(sent.status, STATUS_SENT);
            assert!(sent.issued_at.is_some());

            mark_paid(conn, "i1", "2026-02-01T00:00:00Z")?;
            let paid = find_by_id(conn, "i1")?.unwrap();
            assert_eq!(paid.status, STATUS_PAID);
            assert_eq!(paid.paid_at.as_deref(), Some("2026-02-01T00:00:00Z"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_numbers_with_prefix_scopes_by_year() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            seed(conn);
            insert(conn, &sample_invoice("i1", "INV-2025-0441"))?;
            insert(conn, &sample_invoice("i2", "INV-2026-0001"))?;
            insert(conn, &sample_invoice("i3", "INV-2026-0002"))?;

            let numbers = numbers_with_prefix(conn, "INV-2026-")?;
            assert_eq!(numbers.len(), 2);
            assert!(numbers.iter().all(|n| n.starts_with("INV-2026-")));
            Ok(())
        })
        .unwrap();
    }
}
