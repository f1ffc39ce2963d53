//! Work order and item queries.

use super::PlanStore;
use crate::{
    error::{PlanError, PlanResult},
    work_order::{ItemStatus, WorkOrder, WorkOrderItem, WorkOrderStatus},
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

const WORK_ORDER_COLUMNS: &str = "work_order_id, order_number, product_type, quantity,
    start_date, ship_date, status, assigned_operator, order_value, created_at";

const ITEM_COLUMNS: &str =
    "item_id, work_order_id, serial_number, status, current_step, revision";

fn work_order_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<WorkOrder> {
    Ok(WorkOrder {
        work_order_id: r.get(0)?,
        order_number: r.get(1)?,
        product_type: r.get(2)?,
        quantity: r.get(3)?,
        start_date: r.get(4)?,
        ship_date: r.get(5)?,
        status: r.get(6)?,
        assigned_operator: r.get(7)?,
        order_value: r.get(8)?,
        created_at: r.get(9)?,
    })
}

fn item_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<WorkOrderItem> {
    Ok(WorkOrderItem {
        item_id: r.get(0)?,
        work_order_id: r.get(1)?,
        serial_number: r.get(2)?,
        status: r.get(3)?,
        current_step: r.get(4)?,
        revision: r.get(5)?,
    })
}

impl PlanStore {
    pub fn insert_work_order(&self, wo: &WorkOrder) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO work_order (work_order_id, order_number, product_type, quantity,
                start_date, ship_date, status, assigned_operator, order_value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                wo.work_order_id,
                wo.order_number,
                wo.product_type,
                wo.quantity,
                wo.start_date,
                wo.ship_date,
                wo.status,
                wo.assigned_operator,
                wo.order_value,
                wo.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_work_order(&self, work_order_id: &str) -> PlanResult<WorkOrder> {
        self.conn
            .query_row(
                &format!("SELECT {WORK_ORDER_COLUMNS} FROM work_order WHERE work_order_id=?1"),
                params![work_order_id],
                work_order_from_row,
            )
            .optional()?
            .ok_or_else(|| PlanError::not_found("work order", work_order_id))
    }

    pub fn work_order_by_number(&self, order_number: &str) -> PlanResult<Option<WorkOrder>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {WORK_ORDER_COLUMNS} FROM work_order WHERE order_number=?1"),
                params![order_number],
                work_order_from_row,
            )
            .optional()?)
    }

    pub fn list_work_orders(&self) -> PlanResult<Vec<WorkOrder>> {
        self.query_work_orders(
            &format!("SELECT {WORK_ORDER_COLUMNS} FROM work_order ORDER BY order_number"),
            [],
        )
    }

    /// Orders of a product type that still have work left.
    pub fn open_work_orders_for_product(&self, product_type: &str) -> PlanResult<Vec<WorkOrder>> {
        self.query_work_orders(
            &format!(
                "SELECT {WORK_ORDER_COLUMNS} FROM work_order
                 WHERE product_type=?1 AND status != ?2
                 ORDER BY order_number"
            ),
            params![product_type, WorkOrderStatus::Completed],
        )
    }

    /// Scheduled orders whose `[start, ship or start]` span touches the window.
    pub fn work_orders_in_window(&self, start: NaiveDate, end: NaiveDate) -> PlanResult<Vec<WorkOrder>> {
        self.query_work_orders(
            &format!(
                "SELECT {WORK_ORDER_COLUMNS} FROM work_order
                 WHERE start_date IS NOT NULL
                   AND start_date <= ?2
                   AND MAX(start_date, COALESCE(ship_date, start_date)) >= ?1
                 ORDER BY start_date, order_number"
            ),
            params![start, end],
        )
    }

    pub fn unscheduled_work_orders(&self) -> PlanResult<Vec<WorkOrder>> {
        self.query_work_orders(
            &format!(
                "SELECT {WORK_ORDER_COLUMNS} FROM work_order
                 WHERE start_date IS NULL
                 ORDER BY ship_date IS NULL, ship_date, order_number"
            ),
            [],
        )
    }

    pub fn search_work_orders(&self, term: &str) -> PlanResult<Vec<WorkOrder>> {
        self.query_work_orders(
            &format!(
                "SELECT {WORK_ORDER_COLUMNS} FROM work_order
                 WHERE order_number LIKE ?1 ESCAPE '\\' OR product_type LIKE ?1 ESCAPE '\\'
                 ORDER BY order_number"
            ),
            params![like_pattern(term)],
        )
    }

    pub fn update_work_order_schedule(
        &self,
        work_order_id: &str,
        start_date: Option<NaiveDate>,
        ship_date: Option<NaiveDate>,
    ) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE work_order SET start_date=?1, ship_date=?2 WHERE work_order_id=?3",
            params![start_date, ship_date, work_order_id],
        )?;
        Ok(())
    }

    pub fn update_work_order_status(&self, work_order_id: &str, status: WorkOrderStatus) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE work_order SET status=?1 WHERE work_order_id=?2",
            params![status, work_order_id],
        )?;
        Ok(())
    }

    pub fn update_work_order_value(&self, work_order_id: &str, order_value: f64) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE work_order SET order_value=?1 WHERE work_order_id=?2",
            params![order_value, work_order_id],
        )?;
        Ok(())
    }

    pub fn set_work_order_operator(&self, work_order_id: &str, operator_id: Option<&str>) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE work_order SET assigned_operator=?1 WHERE work_order_id=?2",
            params![operator_id, work_order_id],
        )?;
        Ok(())
    }

    // ── Items ─────────────────────────────────────────────────

    pub fn insert_item(&self, item: &WorkOrderItem) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO work_order_item (item_id, work_order_id, serial_number, status,
                current_step, revision)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.item_id,
                item.work_order_id,
                item.serial_number,
                item.status,
                item.current_step,
                item.revision,
            ],
        )?;
        Ok(())
    }

    pub fn get_item(&self, item_id: &str) -> PlanResult<WorkOrderItem> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM work_order_item WHERE item_id=?1"),
                params![item_id],
                item_from_row,
            )
            .optional()?
            .ok_or_else(|| PlanError::not_found("work order item", item_id))
    }

    pub fn item_by_serial(&self, serial_number: &str) -> PlanResult<Option<WorkOrderItem>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM work_order_item WHERE serial_number=?1"),
                params![serial_number],
                item_from_row,
            )
            .optional()?)
    }

    pub fn items_for_work_order(&self, work_order_id: &str) -> PlanResult<Vec<WorkOrderItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM work_order_item WHERE work_order_id=?1
             ORDER BY serial_number"
        ))?;
        let rows = stmt
            .query_map(params![work_order_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn search_items(&self, term: &str) -> PlanResult<Vec<WorkOrderItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM work_order_item
             WHERE serial_number LIKE ?1 ESCAPE '\\'
             ORDER BY serial_number"
        ))?;
        let rows = stmt
            .query_map(params![like_pattern(term)], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_item_progress(&self, item_id: &str, status: ItemStatus, current_step: u32) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE work_order_item SET status=?1, current_step=?2, revision=revision+1
             WHERE item_id=?3",
            params![status, current_step, item_id],
        )?;
        Ok(())
    }

    pub fn bump_item_revision(&self, item_id: &str) -> PlanResult<()> {
        self.conn.execute(
            "UPDATE work_order_item SET revision=revision+1 WHERE item_id=?1",
            params![item_id],
        )?;
        Ok(())
    }

    fn query_work_orders<P: rusqlite::Params>(&self, sql: &str, params: P) -> PlanResult<Vec<WorkOrder>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, work_order_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
