//! Quote repository — pricing input for invoice synthesis.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::error::DatabaseError;

/// A quote row. Amounts are integer cents.
#[derive(Debug, Clone)]
pub struct QuoteRow {
    pub id: String,
    pub client_id: Option<String>,
    /// JSON array of line items.
    pub line_items: String,
    pub stump_grinding_cents: i64,
    pub addon_cents: i64,
    pub discount_percent: f64,
    pub discount_cents: i64,
    pub tax_rate_percent: f64,
    pub created_at: String,
}

/// One quoted line item. Only `selected` items are billed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuoteLineItem {
    pub description: String,
    pub amount_cents: i64,
    pub selected: bool,
}

impl QuoteRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            line_items: row.get("line_items")?,
            stump_grinding_cents: row.get("stump_grinding_cents")?,
            addon_cents: row.get("addon_cents")?,
            discount_percent: row.get("discount_percent")?,
            discount_cents: row.get("discount_cents")?,
            tax_rate_percent: row.get("tax_rate_percent")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Decodes the line items JSON column.
    pub fn items(&self) -> Result<Vec<QuoteLineItem>, DatabaseError> {
        serde_json::from_str(&self.line_items).map_err(|e| DatabaseError::Corrupt {
            table: "quotes",
            column: "line_items",
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

pub fn insert(conn: &Connection, quote: &QuoteRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO quotes (id, client_id, line_items, stump_grinding_cents, addon_cents,
         discount_percent, discount_cents, tax_rate_percent, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            quote.id,
            quote.client_id,
            quote.line_items,
            quote.stump_grinding_cents,
            quote.addon_cents,
            quote.discount_percent,
            quote.discount_cents,
            quote.tax_rate_percent,
            quote.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<QuoteRow>, DatabaseError> {
    conn.query_row("SELECT * FROM quotes WHERE id = ?1", params![id], |row| {
        QuoteRow::from_row(row)
    })
    .optional()
    .map_err(DatabaseError::Sqlite)
}
