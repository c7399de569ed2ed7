//! Builders for seeding lifecycle fixtures without repetitive boilerplate.
//!
//! Tests seed jobs directly through the repositories to get a fixture into
//! an arbitrary state quickly; the transitions under test still go through
//! the engine.

#![allow(dead_code)]

use chrono::Utc;

use fieldflow::db::client_repo::{self, ClientRow, PropertyRow};
use fieldflow::db::job_repo::{self, ChecklistItem, JobRow};
use fieldflow::db::quote_repo::{self, QuoteLineItem, QuoteRow};
use fieldflow::db::form_repo::{self, FormRow};
use fieldflow::{Database, JobState};

pub fn seed_client(db: &Database, id: &str, name: &str) {
    seed_client_with_category(db, id, name, "potential");
}

pub fn seed_client_with_category(db: &Database, id: &str, name: &str, category: &str) {
    let now = Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        client_repo::insert_client(
            conn,
            &ClientRow {
                id: id.to_string(),
                name: name.to_string(),
                email: Some(format!("{id}@example.com")),
                phone: None,
                billing_address: Some("12 Elm Street".to_string()),
                category: category.to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
            },
        )
    })
    .unwrap();
}

pub fn seed_property(db: &Database, id: &str, client_id: &str, address: &str) {
    db.with_conn(|conn| {
        client_repo::insert_property(
            conn,
            &PropertyRow {
                id: id.to_string(),
                client_id: client_id.to_string(),
                address: address.to_string(),
                notes: None,
            },
        )
    })
    .unwrap();
}

/// Seeds a quote whose items are all selected.
pub fn seed_quote(db: &Database, id: &str, amounts_cents: &[i64]) {
    let items: Vec<QuoteLineItem> = amounts_cents
        .iter()
        .enumerate()
        .map(|(i, amount)| QuoteLineItem {
            description: format!("Line item {}", i + 1),
            amount_cents: *amount,
            selected: true,
        })
        .collect();
    seed_quote_with_items(db, id, &items);
}

pub fn seed_quote_with_items(db: &Database, id: &str, items: &[QuoteLineItem]) {
    db.with_conn(|conn| {
        quote_repo::insert(
            conn,
            &QuoteRow {
                id: id.to_string(),
                client_id: None,
                line_items: serde_json::to_string(items).unwrap(),
                stump_grinding_cents: 0,
                addon_cents: 0,
                discount_percent: 0.0,
                discount_cents: 0,
                tax_rate_percent: 0.0,
                created_at: Utc::now().to_rfc3339(),
            },
        )
    })
    .unwrap();
}

pub fn seed_form(db: &Database, id: &str, job_id: &str, name: &str, status: &str) {
    db.with_conn(|conn| {
        form_repo::insert(
            conn,
            &FormRow {
                id: id.to_string(),
                job_id: job_id.to_string(),
                name: name.to_string(),
                status: status.to_string(),
                created_at: Utc::now().to_rfc3339(),
            },
        )
    })
    .unwrap();
}

/// Builder for job fixtures in arbitrary lifecycle states.
pub struct JobBuilder {
    row: JobRow,
}

impl JobBuilder {
    pub fn new(id: &str, client_id: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            row: JobRow {
                id: id.to_string(),
                client_id: client_id.to_string(),
                property_id: None,
                quote_id: None,
                status: JobState::Draft.as_str().to_string(),
                last_state_change: Some(now.clone()),
                scheduled_date: None,
                assigned_crew: "[]".to_string(),
                jha_required: false,
                jha: None,
                jha_acknowledged_at: None,
                permit_required: false,
                permit_status: None,
                deposit_required: false,
                deposit_status: None,
                work_start_time: None,
                work_end_time: None,
                completion_checklist: "[]".to_string(),
                invoice_id: None,
                payment_received_at: None,
                weather_hold_reason: None,
                created_at: now.clone(),
                updated_at: now,
            },
        }
    }

    pub fn status(mut self, state: JobState) -> Self {
        self.row.status = state.as_str().to_string();
        self
    }

    pub fn scheduled(mut self, date: &str, crew: &[&str]) -> Self {
        self.row.scheduled_date = Some(date.to_string());
        self.row.assigned_crew = serde_json::to_string(crew).unwrap();
        self
    }

    pub fn property(mut self, property_id: &str) -> Self {
        self.row.property_id = Some(property_id.to_string());
        self
    }

    pub fn quote(mut self, quote_id: &str) -> Self {
        self.row.quote_id = Some(quote_id.to_string());
        self
    }

    pub fn work_times(mut self, start: &str, end: &str) -> Self {
        self.row.work_start_time = Some(start.to_string());
        self.row.work_end_time = Some(end.to_string());
        self
    }

    pub fn work_started(mut self, start: &str) -> Self {
        self.row.work_start_time = Some(start.to_string());
        self
    }

    pub fn checklist(mut self, items: &[(&str, bool)]) -> Self {
        let items: Vec<ChecklistItem> = items
            .iter()
            .map(|(item, checked)| ChecklistItem {
                item: item.to_string(),
                checked: *checked,
            })
            .collect();
        self.row.completion_checklist = serde_json::to_string(&items).unwrap();
        self
    }

    pub fn jha_required(mut self) -> Self {
        self.row.jha_required = true;
        self
    }

    pub fn jha_acknowledged(mut self, jha: &str, at: &str) -> Self {
        self.row.jha = Some(jha.to_string());
        self.row.jha_acknowledged_at = Some(at.to_string());
        self
    }

    pub fn permit(mut self, required: bool, status: Option<&str>) -> Self {
        self.row.permit_required = required;
        self.row.permit_status = status.map(str::to_string);
        self
    }

    pub fn deposit(mut self, required: bool, status: Option<&str>) -> Self {
        self.row.deposit_required = required;
        self.row.deposit_status = status.map(str::to_string);
        self
    }

    pub fn payment_received(mut self, at: &str) -> Self {
        self.row.payment_received_at = Some(at.to_string());
        self
    }

    pub fn insert(self, db: &Database) -> JobRow {
        db.with_conn(|conn| job_repo::insert(conn, &self.row)).unwrap();
        self.row
    }
}
