//! Production step, step execution and certificate queries.

use super::PlanStore;
use crate::{
    error::{PlanError, PlanResult},
    execution::{Certificate, ProductionStep, StepExecution},
};
use rusqlite::{params, OptionalExtension};

fn step_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ProductionStep> {
    Ok(ProductionStep {
        step_id: r.get(0)?,
        product_type: r.get(1)?,
        position: r.get(2)?,
        name: r.get(3)?,
    })
}

fn execution_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StepExecution> {
    Ok(StepExecution {
        execution_id: r.get(0)?,
        item_id: r.get(1)?,
        step_id: r.get(2)?,
        status: r.get(3)?,
        operator_id: r.get(4)?,
        started_at: r.get(5)?,
        finished_at: r.get(6)?,
        notes: r.get(7)?,
    })
}

fn certificate_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Certificate> {
    Ok(Certificate {
        certificate_id: r.get(0)?,
        item_id: r.get(1)?,
        work_order_id: r.get(2)?,
        certificate_number: r.get(3)?,
        issued_at: r.get(4)?,
    })
}

impl PlanStore {
    pub fn get_step(&self, step_id: &str) -> PlanResult<ProductionStep> {
        self.conn
            .query_row(
                "SELECT step_id, product_type, position, name
                 FROM production_step WHERE step_id=?1 AND retired = 0",
                params![step_id],
                step_from_row,
            )
            .optional()?
            .ok_or_else(|| PlanError::not_found("production step", step_id))
    }

    pub fn steps_for_product(&self, product_type: &str) -> PlanResult<Vec<ProductionStep>> {
        let mut stmt = self.conn.prepare(
            "SELECT step_id, product_type, position, name
             FROM production_step WHERE product_type=?1 AND retired = 0
             ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![product_type], step_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert or overwrite the single execution row for (item, step).
    pub fn upsert_execution(&self, e: &StepExecution) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO step_execution (execution_id, item_id, step_id, status,
                operator_id, started_at, finished_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(item_id, step_id) DO UPDATE SET
                status      = excluded.status,
                operator_id = excluded.operator_id,
                started_at  = excluded.started_at,
                finished_at = excluded.finished_at,
                notes       = excluded.notes",
            params![
                e.execution_id,
                e.item_id,
                e.step_id,
                e.status,
                e.operator_id,
                e.started_at,
                e.finished_at,
                e.notes,
            ],
        )?;
        Ok(())
    }

    pub fn get_execution(&self, item_id: &str, step_id: &str) -> PlanResult<Option<StepExecution>> {
        Ok(self
            .conn
            .query_row(
                "SELECT execution_id, item_id, step_id, status, operator_id,
                        started_at, finished_at, notes
                 FROM step_execution WHERE item_id=?1 AND step_id=?2",
                params![item_id, step_id],
                execution_from_row,
            )
            .optional()?)
    }

    pub fn executions_for_item(&self, item_id: &str) -> PlanResult<Vec<StepExecution>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.execution_id, e.item_id, e.step_id, e.status, e.operator_id,
                    e.started_at, e.finished_at, e.notes
             FROM step_execution e
             JOIN production_step s ON s.step_id = e.step_id
             WHERE e.item_id=?1
             ORDER BY s.position",
        )?;
        let rows = stmt
            .query_map(params![item_id], execution_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn execution_count(&self, item_id: &str) -> PlanResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM step_execution WHERE item_id=?1",
            params![item_id],
            |r| r.get(0),
        )?)
    }

    pub fn insert_certificate(&self, c: &Certificate) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO certificate (certificate_id, item_id, work_order_id,
                certificate_number, issued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![c.certificate_id, c.item_id, c.work_order_id, c.certificate_number, c.issued_at],
        )?;
        Ok(())
    }

    pub fn certificate_for_item(&self, item_id: &str) -> PlanResult<Option<Certificate>> {
        Ok(self
            .conn
            .query_row(
                "SELECT certificate_id, item_id, work_order_id, certificate_number, issued_at
                 FROM certificate WHERE item_id=?1",
                params![item_id],
                certificate_from_row,
            )
            .optional()?)
    }

    pub fn certificates_for_work_order(&self, work_order_id: &str) -> PlanResult<Vec<Certificate>> {
        let mut stmt = self.conn.prepare(
            "SELECT certificate_id, item_id, work_order_id, certificate_number, issued_at
             FROM certificate WHERE work_order_id=?1
             ORDER BY certificate_number",
        )?;
        let rows = stmt
            .query_map(params![work_order_id], certificate_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
