//! Transaction ledger collaborator
//!
//! The category engine never owns transaction rows; it consumes them
//! through [`TransactionLedger`] for the deletion guard, the recent
//! activity shown by `find_one`, and subtree statistics. Amounts are
//! integer minor units so aggregate sums are exact.

use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::storage::category::CategoryId;

/// Summary projection of a ledger transaction (id, amount, note, date)
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub id: i64,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Count and amount of the transactions referencing one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionAggregate {
    pub count: u64,
    pub amount_cents: i64,
}

/// Read-side interface to the external transaction ledger
pub trait TransactionLedger {
    /// Number of transactions referencing the category
    fn count_for_category(&self, id: CategoryId) -> Result<u64>;

    /// Count and summed amount for the category
    fn aggregate_for_category(&self, id: CategoryId) -> Result<TransactionAggregate>;

    /// Most recent transactions for the category, newest first
    fn recent_for_category(
        &self,
        id: CategoryId,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>>;
}

// =============================================================================
// SQLite ledger
// =============================================================================

/// Ledger backed by a `transactions` table, typically in the same
/// database file as the category store.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS transactions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id  INTEGER NOT NULL,
                amount_cents INTEGER NOT NULL,
                note         TEXT,
                occurred_at  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_category
                ON transactions(category_id);",
        )?;
        Ok(Self { conn })
    }

    /// Record a transaction against a category. Used by the CLI to
    /// seed demo data; the real system writes through its own service.
    pub fn record(
        &self,
        category_id: CategoryId,
        amount_cents: i64,
        note: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions (category_id, amount_cents, note, occurred_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![category_id, amount_cents, note, Utc::now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl TransactionLedger for SqliteLedger {
    fn count_for_category(&self, id: CategoryId) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn aggregate_for_category(&self, id: CategoryId) -> Result<TransactionAggregate> {
        let (count, amount): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(amount_cents), 0) \
             FROM transactions WHERE category_id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TransactionAggregate {
            count: count as u64,
            amount_cents: amount,
        })
    }

    fn recent_for_category(
        &self,
        id: CategoryId,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount_cents, note, occurred_at \
             FROM transactions WHERE category_id = ?1 \
             ORDER BY occurred_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![id, limit as i64], |row| {
            Ok(TransactionSummary {
                id: row.get(0)?,
                amount_cents: row.get(1)?,
                note: row.get(2)?,
                occurred_at: row.get(3)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

// =============================================================================
// In-memory ledger
// =============================================================================

/// Test double holding transactions in memory
#[derive(Default)]
pub struct MemoryLedger {
    rows: RefCell<Vec<(CategoryId, TransactionSummary)>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, category_id: CategoryId, amount_cents: i64, note: Option<&str>) {
        let mut rows = self.rows.borrow_mut();
        let id = rows.len() as i64 + 1;
        rows.push((
            category_id,
            TransactionSummary {
                id,
                amount_cents,
                note: note.map(str::to_string),
                occurred_at: Utc::now(),
            },
        ));
    }
}

impl TransactionLedger for MemoryLedger {
    fn count_for_category(&self, id: CategoryId) -> Result<u64> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .filter(|(cat, _)| *cat == id)
            .count() as u64)
    }

    fn aggregate_for_category(&self, id: CategoryId) -> Result<TransactionAggregate> {
        let rows = self.rows.borrow();
        let mut agg = TransactionAggregate::default();
        for (_, tx) in rows.iter().filter(|(cat, _)| *cat == id) {
            agg.count += 1;
            agg.amount_cents += tx.amount_cents;
        }
        Ok(agg)
    }

    fn recent_for_category(
        &self,
        id: CategoryId,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>> {
        let rows = self.rows.borrow();
        let mut matching: Vec<TransactionSummary> = rows
            .iter()
            .filter(|(cat, _)| *cat == id)
            .map(|(_, tx)| tx.clone())
            .collect();
        matching.reverse(); // insertion order, newest first
        matching.truncate(limit);
        Ok(matching)
    }
}
