//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! Components call store methods and never execute SQL directly.

use crate::{
    config::{EnforcementMode, ProductRoute},
    error::PlanResult,
    event::{EventLogEntry, PlanEvent},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

mod assignment;
mod availability;
mod execution;
mod operator;
mod preference;
mod work_order;

pub struct PlanStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// An open write transaction. Dropping it without `commit()` rolls back.
/// In advisory mode it wraps nothing and every statement autocommits.
pub struct StoreTxn<'a> {
    inner: Option<Transaction<'a>>,
}

impl StoreTxn<'_> {
    pub fn commit(self) -> PlanResult<()> {
        if let Some(tx) = self.inner {
            tx.commit()?;
        }
        Ok(())
    }
}

impl PlanStore {
    pub fn open(path: &str) -> PlanResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // Concurrent writers wait for each other instead of failing at once.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PlanResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> PlanResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order. Safe to run repeatedly.
    pub fn migrate(&self) -> PlanResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_operators.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_work_orders.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_assignments.sql"))?;
        Ok(())
    }

    /// Begin an IMMEDIATE transaction: the write lock is taken up front,
    /// so reads inside it cannot be invalidated by another writer.
    pub fn begin_immediate(&self) -> PlanResult<StoreTxn<'_>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        Ok(StoreTxn { inner: Some(tx) })
    }

    pub fn begin(&self, mode: EnforcementMode) -> PlanResult<StoreTxn<'_>> {
        match mode {
            EnforcementMode::Authoritative => self.begin_immediate(),
            EnforcementMode::Advisory => Ok(StoreTxn { inner: None }),
        }
    }

    // ── Production routes ─────────────────────────────────────

    /// Mirror the configured routes into production_step. Existing steps
    /// are updated in place so executions referencing them stay valid.
    /// Steps no longer in any route are kept but marked retired.
    pub fn sync_routes<'r>(&self, routes: impl IntoIterator<Item = &'r ProductRoute>) -> PlanResult<usize> {
        let tx = self.begin_immediate()?;
        self.conn.execute("UPDATE production_step SET retired = 1", [])?;
        let mut count = 0;
        {
            let mut stmt = self.conn.prepare(
                "INSERT INTO production_step (step_id, product_type, position, name, retired)
                 VALUES (?1, ?2, ?3, ?4, 0)
                 ON CONFLICT(step_id) DO UPDATE SET
                    product_type = excluded.product_type,
                    position     = excluded.position,
                    name         = excluded.name,
                    retired      = 0",
            )?;
            for route in routes {
                for (position, step) in route.steps.iter().enumerate() {
                    stmt.execute(params![step.step_id, route.product_type, position as u32, step.name])?;
                    count += 1;
                }
            }
        }
        let retired: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM production_step WHERE retired = 1",
            [],
            |r| r.get(0),
        )?;
        tx.commit()?;
        if retired > 0 {
            log::info!("Route sync retired {retired} steps");
        }
        Ok(count)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, event: &PlanEvent, at: DateTime<Utc>) -> PlanResult<()> {
        let entry = EventLogEntry {
            id: None,
            entity_id: event.entity_id().to_string(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_string(event)?,
            created_at: at,
        };
        self.conn.execute(
            "INSERT INTO event_log (entity_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.entity_id, entry.event_type, entry.payload, entry.created_at],
        )?;
        Ok(())
    }

    pub fn events_for_entity(&self, entity_id: &str) -> PlanResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_id, event_type, payload, created_at
             FROM event_log WHERE entity_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![entity_id], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn recent_events(&self, limit: usize) -> PlanResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_id, event_type, payload, created_at
             FROM event_log ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self) -> PlanResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |r| r.get(0))?)
    }
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventLogEntry> {
    Ok(EventLogEntry {
        id: Some(row.get(0)?),
        entity_id: row.get(1)?,
        event_type: row.get(2)?,
        payload: row.get(3)?,
        created_at: row.get(4)?,
    })
}
