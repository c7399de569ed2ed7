//! Invoice number allocation.
//!
//! Numbers look like `INV-2026-0047`: a prefix, the calendar year, and a
//! per-year sequence zero-padded to four digits. Concurrent allocations in
//! the same year race on a read-max-then-insert pattern, so the sequence
//! scan runs under the year's named lock. The returned [`YearSequence`]
//! keeps that lock held until it is dropped — callers hold it across their
//! insert so the computed number is persisted before the next allocator
//! scans. If the lock or the scan fails, allocation falls back to a
//! timestamp-derived suffix instead of blocking invoice creation; the
//! UNIQUE constraint on `invoice_number` remains the backstop.

use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use rusqlite::Connection;

use crate::db::{invoice_repo, locks::LockGuard, LockManager};

/// An allocated invoice number, holding the year lock (when the sequence
/// path succeeded) until dropped.
pub struct YearSequence<'a> {
    number: String,
    fallback: bool,
    _guard: Option<LockGuard<'a>>,
}

impl YearSequence<'_> {
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Whether this number came from the degraded timestamp path.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Allocates the next invoice number for `year`.
///
/// Never fails: any error on the sequence path is logged and answered with
/// a fallback number.
pub fn allocate<'a>(
    conn: &Connection,
    locks: &'a LockManager,
    prefix: &str,
    year: i32,
    lock_timeout: Duration,
) -> YearSequence<'a> {
    let lock_name = year_lock_name(year);

    let guard = match locks.acquire(&lock_name, lock_timeout) {
        Ok(guard) => guard,
        Err(e) => {
            log::error!("Invoice numbering lock '{lock_name}' unavailable: {e}; using fallback");
            return YearSequence {
                number: fallback_number(prefix, year),
                fallback: true,
                _guard: None,
            };
        }
    };

    match next_in_sequence(conn, prefix, year) {
        Ok(number) => YearSequence {
            number,
            fallback: false,
            _guard: Some(guard),
        },
        Err(e) => {
            log::error!("Invoice number scan failed for {year}: {e}; using fallback");
            YearSequence {
                number: fallback_number(prefix, year),
                fallback: true,
                _guard: None,
            }
        }
    }
}

/// Name of the per-year allocation lock.
pub fn year_lock_name(year: i32) -> String {
    format!("invoice-seq/{year}")
}

/// Scans the year's existing numbers and returns max + 1, zero-padded to at
/// least four digits. Must be called with the year lock held.
fn next_in_sequence(
    conn: &Connection,
    prefix: &str,
    year: i32,
) -> Result<String, crate::db::DatabaseError> {
    let numbers = invoice_repo::numbers_with_prefix(conn, &format!("{prefix}-{year}-"))?;
    let next = highest_sequence(&numbers, prefix, year) + 1;
    Ok(format!("{prefix}-{year}-{next:04}"))
}

/// Extracts the numeric suffixes and returns the maximum, comparing as
/// integers so `10000` outranks `9999` (string order would not).
fn highest_sequence(numbers: &[String], prefix: &str, year: i32) -> u64 {
    let pattern = format!(r"^{}-{year}-(\d+)$", regex::escape(prefix));
    // The pattern is built from a vetted prefix; a compile failure would be
    // a bug, and falling back to zero only restarts the sequence scan.
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::error!("Invalid invoice number pattern '{pattern}': {e}");
            return 0;
        }
    };

    numbers
        .iter()
        .filter_map(|n| re.captures(n))
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Timestamp-derived fallback. Microsecond resolution keeps two fallbacks
/// in the same instant apart in practice; the UNIQUE constraint catches the
/// rest.
pub fn fallback_number(prefix: &str, year: i32) -> String {
    format!("{prefix}-{year}-{}", Utc::now().timestamp_micros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DatabaseError};

    fn seed_invoice(conn: &Connection, id: &str, number: &str) {
        conn.execute(
            "INSERT INTO invoices (id, job_id, client_id, invoice_number, created_at)
             VALUES (?1, 'j1', 'c1', ?2, '2026-01-01T00:00:00Z')",
            rusqlite::params![id, number],
        )
        .unwrap();
    }

    fn seed_job(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO clients (id, name, category, created_at, updated_at)
             VALUES ('c1', 'Test', 'potential', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');
             INSERT INTO jobs (id, client_id, status, created_at, updated_at)
             VALUES ('j1', 'c1', 'completed', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');",
        )
        .unwrap();
    }

    #[test]
    fn test_first_number_of_year() {
        let db = Database::open_in_memory().unwrap();
        let locks = LockManager::new();
        db.with_conn(|conn| {
            seed_job(conn);
            let seq = allocate(conn, &locks, "INV", 2026, Duration::from_millis(100));
            assert_eq!(seq.number(), "INV-2026-0001");
            assert!(!seq.is_fallback());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_continues_existing_sequence() {
        let db = Database::open_in_memory().unwrap();
        let locks = LockManager::new();
        db.with_conn(|conn| {
            seed_job(conn);
            seed_invoice(conn, "i1", "INV-2026-0041");
            seed_invoice(conn, "i2", "INV-2026-0007");
            seed_invoice(conn, "i3", "INV-2025-0999");

            let seq = allocate(conn, &locks, "INV", 2026, Duration::from_millis(100));
            assert_eq!(seq.number(), "INV-2026-0042");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_numeric_ordering_beyond_four_digits() {
        let db = Database::open_in_memory().unwrap();
        let locks = LockManager::new();
        db.with_conn(|conn| {
            seed_job(conn);
            seed_invoice(conn, "i1", "INV-2026-9999");
            seed_invoice(conn, "i2", "INV-2026-10001");

            // Lexicographically "9999" > "10001"; numerically it is not.
            let seq = allocate(conn, &locks, "INV", 2026, Duration::from_millis(100));
            assert_eq!(seq.number(), "INV-2026-10002");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_ignores_malformed_and_fallback_shaped_numbers() {
        let numbers = vec![
            "INV-2026-0003".to_string(),
            "INV-2026-draft".to_string(),
            "OTHER-2026-9000".to_string(),
            "INV-2025-9000".to_string(),
        ];
        assert_eq!(highest_sequence(&numbers, "INV", 2026), 3);
    }

    #[test]
    fn test_falls_back_when_year_lock_is_held() {
        let db = Database::open_in_memory().unwrap();
        let locks = LockManager::new();
        let _held = locks
            .acquire(&year_lock_name(2026), Duration::from_millis(100))
            .unwrap();

        db.with_conn(|conn| {
            seed_job(conn);
            let seq = allocate(conn, &locks, "INV", 2026, Duration::from_millis(20));
            assert!(seq.is_fallback());
            assert!(seq.number().starts_with("INV-2026-"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_year_lock_released_after_drop() {
        let db = Database::open_in_memory().unwrap();
        let locks = LockManager::new();
        db.with_conn(|conn| {
            seed_job(conn);
            let seq = allocate(conn, &locks, "INV", 2026, Duration::from_millis(100));
            drop(seq);

            // A leaked guard would force this onto the fallback path.
            let again = allocate(conn, &locks, "INV", 2026, Duration::from_millis(100));
            assert!(!again.is_fallback());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_sequence_path_holds_lock_until_dropped() {
        let db = Database::open_in_memory().unwrap();
        let locks = LockManager::new();
        db.with_conn(|conn| {
            seed_job(conn);
            let seq = allocate(conn, &locks, "INV", 2026, Duration::from_millis(100));
            assert!(!seq.is_fallback());

            let err = locks
                .acquire(&year_lock_name(2026), Duration::from_millis(20))
                .unwrap_err();
            assert!(matches!(err, DatabaseError::LockTimeout { .. }));
            Ok(())
        })
        .unwrap();
    }
}
