//! Operator and role queries.

use super::PlanStore;
use crate::{
    error::{PlanError, PlanResult},
    operator::{Operator, Role},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

const OPERATOR_COLUMNS: &str =
    "operator_id, display_name, avatar_url, daily_capacity_hours, is_available, created_at";

fn operator_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Operator> {
    Ok(Operator {
        operator_id: r.get(0)?,
        display_name: r.get(1)?,
        avatar_url: r.get(2)?,
        daily_capacity_hours: r.get(3)?,
        is_available: r.get(4)?,
        created_at: r.get(5)?,
    })
}

impl PlanStore {
    pub fn insert_operator(&self, op: &Operator) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO operator (operator_id, display_name, avatar_url,
                daily_capacity_hours, is_available, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                op.operator_id,
                op.display_name,
                op.avatar_url,
                op.daily_capacity_hours,
                op.is_available,
                op.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_operator(&self, op: &Operator) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE operator SET display_name=?1, avatar_url=?2, daily_capacity_hours=?3
             WHERE operator_id=?4",
            params![op.display_name, op.avatar_url, op.daily_capacity_hours, op.operator_id],
        )?;
        Ok(())
    }

    pub fn get_operator(&self, operator_id: &str) -> PlanResult<Operator> {
        self.conn
            .query_row(
                &format!("SELECT {OPERATOR_COLUMNS} FROM operator WHERE operator_id=?1"),
                params![operator_id],
                operator_from_row,
            )
            .optional()?
            .ok_or_else(|| PlanError::not_found("operator", operator_id))
    }

    pub fn list_operators(&self) -> PlanResult<Vec<Operator>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OPERATOR_COLUMNS} FROM operator ORDER BY display_name, operator_id"
        ))?;
        let rows = stmt
            .query_map([], operator_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn schedulable_operators(&self) -> PlanResult<Vec<Operator>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.operator_id, o.display_name, o.avatar_url, o.daily_capacity_hours,
                    o.is_available, o.created_at
             FROM operator o
             JOIN operator_role r ON r.operator_id = o.operator_id AND r.role = ?1
             ORDER BY o.display_name, o.operator_id",
        )?;
        let rows = stmt
            .query_map(params![Role::Operator], operator_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_operator_available(&self, operator_id: &str, is_available: bool) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE operator SET is_available=?1 WHERE operator_id=?2",
            params![is_available, operator_id],
        )?;
        Ok(())
    }

    /// Returns false when the role was already held.
    pub fn grant_role(&self, operator_id: &str, role: Role, at: DateTime<Utc>) -> PlanResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO operator_role (operator_id, role, granted_at)
             VALUES (?1, ?2, ?3)",
            params![operator_id, role, at],
        )?;
        Ok(changed > 0)
    }

    pub fn revoke_role(&self, operator_id: &str, role: Role) -> PlanResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM operator_role WHERE operator_id=?1 AND role=?2",
            params![operator_id, role],
        )?;
        Ok(changed > 0)
    }

    pub fn roles_of(&self, operator_id: &str) -> PlanResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT role FROM operator_role WHERE operator_id=?1")?;
        let mut roles = stmt
            .query_map(params![operator_id], |r| r.get::<_, Role>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        roles.sort();
        Ok(roles)
    }
}
