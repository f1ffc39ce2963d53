//! Assignment queries.

use super::PlanStore;
use crate::{
    assignment::{Assignment, AssignmentTarget},
    error::PlanResult,
};
use chrono::NaiveDate;
use rusqlite::params;

fn assignment_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
    let item_id: String = r.get(3)?;
    let step_id: Option<String> = r.get(4)?;
    let target = match step_id {
        Some(step_id) => AssignmentTarget::Step { item_id, step_id },
        None => AssignmentTarget::Item { item_id },
    };
    Ok(Assignment {
        assignment_id: r.get(0)?,
        operator_id: r.get(1)?,
        work_date: r.get(2)?,
        target,
        created_at: r.get(5)?,
    })
}

impl PlanStore {
    /// Insert, or replace whoever held the same target before.
    pub fn upsert_assignment(&self, a: &Assignment) -> PlanResult<()> {
        let step_id = a.target.step_id();
        self.conn.execute(
            "INSERT INTO assignment (assignment_id, operator_id, work_date, item_id,
                step_id, step_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(item_id, step_key) DO UPDATE SET
                operator_id = excluded.operator_id,
                work_date   = excluded.work_date,
                created_at  = excluded.created_at",
            params![
                a.assignment_id,
                a.operator_id,
                a.work_date,
                a.target.item_id(),
                step_id,
                step_id.unwrap_or(""),
                a.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn delete_assignment(&self, target: &AssignmentTarget) -> PlanResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM assignment WHERE item_id=?1 AND step_key=?2",
            params![target.item_id(), target.step_id().unwrap_or("")],
        )?;
        Ok(changed > 0)
    }

    pub fn assignments_in_range(&self, start: NaiveDate, end: NaiveDate) -> PlanResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT assignment_id, operator_id, work_date, item_id, step_id, created_at
             FROM assignment WHERE work_date >= ?1 AND work_date <= ?2
             ORDER BY work_date, operator_id, item_id, step_key",
        )?;
        let rows = stmt
            .query_map(params![start, end], assignment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("assignments {start}..={end}: {} rows", rows.len());
        Ok(rows)
    }

    /// Item-level row first, then step rows in route order.
    pub fn assignments_for_item(&self, item_id: &str) -> PlanResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.assignment_id, a.operator_id, a.work_date, a.item_id, a.step_id, a.created_at
             FROM assignment a
             LEFT JOIN production_step s ON s.step_id = a.step_id
             WHERE a.item_id = ?1
             ORDER BY a.step_id IS NOT NULL, s.position",
        )?;
        let rows = stmt
            .query_map(params![item_id], assignment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn distinct_step_operators(&self, item_id: &str) -> PlanResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT operator_id) FROM assignment
             WHERE item_id=?1 AND step_id IS NOT NULL",
            params![item_id],
            |r| r.get(0),
        )?;
        Ok(n as usize)
    }
}
