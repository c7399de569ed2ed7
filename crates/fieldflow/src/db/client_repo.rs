//! Client and property repository.
//!
//! The lifecycle core reads billing contacts from here and flips the
//! client category as jobs complete or cancel. Full client CRUD lives
//! outside this crate.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::DatabaseError;

/// Category for clients with at least one completed job.
pub const CATEGORY_ACTIVE: &str = "active";
/// Category for clients without a completed job yet.
pub const CATEGORY_POTENTIAL: &str = "potential";

/// A client row.
#[derive(Debug, Clone)]
pub struct ClientRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub billing_address: Option<String>,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ClientRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            billing_address: row.get("billing_address")?,
            category: row.get("category")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// A property row.
#[derive(Debug, Clone)]
pub struct PropertyRow {
    pub id: String,
    pub client_id: String,
    pub address: String,
    pub notes: Option<String>,
}

impl PropertyRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            address: row.get("address")?,
            notes: row.get("notes")?,
        })
    }
}

pub fn insert_client(conn: &Connection, client: &ClientRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clients (id, name, email, phone, billing_address, category,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            client.id,
            client.name,
            client.email,
            client.phone,
            client.billing_address,
            client.category,
            client.created_at,
            client.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find_client(conn: &Connection, id: &str) -> Result<Option<ClientRow>, DatabaseError> {
    conn.query_row("SELECT * FROM clients WHERE id = ?1", params![id], |row| {
        ClientRow::from_row(row)
    })
    .optional()
    .map_err(DatabaseError::Sqlite)
}

/// Sets a client's category. Returns whether the value actually changed.
pub fn set_category(conn: &Connection, id: &str, category: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE clients SET category = ?2, updated_at = ?3
         WHERE id = ?1 AND category <> ?2",
        params![id, category, Utc::now().to_rfc3339()],
    )?;
    Ok(changed > 0)
}

pub fn insert_property(conn: &Connection, property: &PropertyRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO properties (id, client_id, address, notes) VALUES (?1, ?2, ?3, ?4)",
        params![
            property.id,
            property.client_id,
            property.address,
            property.notes,
        ],
    )?;
    Ok(())
}

pub fn find_property(conn: &Connection, id: &str) -> Result<Option<PropertyRow>, DatabaseError> {
    conn.query_row(
        "SELECT * FROM properties WHERE id = ?1",
        params![id],
        |row| PropertyRow::from_row(row),
    )
    .optional()
    .map_err(DatabaseError::Sqlite)
}
