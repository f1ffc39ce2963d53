//! Availability queries.

use super::PlanStore;
use crate::{availability::AvailabilityEntry, error::PlanResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

fn entry_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<AvailabilityEntry> {
    Ok(AvailabilityEntry {
        operator_id: r.get(0)?,
        date: r.get(1)?,
        hours: r.get(2)?,
        reason: r.get(3)?,
        note: r.get(4)?,
    })
}

impl PlanStore {
    pub fn upsert_availability(&self, entry: &AvailabilityEntry, at: DateTime<Utc>) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO availability (operator_id, work_date, hours, reason, note, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(operator_id, work_date) DO UPDATE SET
                hours      = excluded.hours,
                reason     = excluded.reason,
                note       = excluded.note,
                updated_at = excluded.updated_at",
            params![entry.operator_id, entry.date, entry.hours, entry.reason, entry.note, at],
        )?;
        Ok(())
    }

    pub fn delete_availability(&self, operator_id: &str, date: NaiveDate) -> PlanResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM availability WHERE operator_id=?1 AND work_date=?2",
            params![operator_id, date],
        )?;
        Ok(changed > 0)
    }

    pub fn availability_on(&self, operator_id: &str, date: NaiveDate) -> PlanResult<Option<AvailabilityEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT operator_id, work_date, hours, reason, note
                 FROM availability WHERE operator_id=?1 AND work_date=?2",
                params![operator_id, date],
                entry_from_row,
            )
            .optional()?)
    }

    /// All entries with `start <= date <= end`, ordered by date then operator.
    pub fn availability_in_range(&self, start: NaiveDate, end: NaiveDate) -> PlanResult<Vec<AvailabilityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT operator_id, work_date, hours, reason, note
             FROM availability WHERE work_date >= ?1 AND work_date <= ?2
             ORDER BY work_date, operator_id",
        )?;
        let rows = stmt
            .query_map(params![start, end], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("availability {start}..={end}: {} rows", rows.len());
        Ok(rows)
    }
}
