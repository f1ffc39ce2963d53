//! Work orders and their items: creation, scheduling, filtering, grouping.

use crate::{
    clock::Clock,
    config::PlannerConfig,
    error::{PlanError, PlanResult},
    event::PlanEvent,
    store::PlanStore,
    types::{text_enum, ItemId, OperatorId, WorkOrderId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group key for work orders without a ship date.
pub const UNSCHEDULED_MONTH: &str = "unscheduled";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Planned,
    InProgress,
    Completed,
    OnHold,
}

text_enum!(WorkOrderStatus, "work order status" {
    Planned    => "planned",
    InProgress => "in_progress",
    Completed  => "completed",
    OnHold     => "on_hold",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
}

text_enum!(ItemStatus, "item status" {
    Pending    => "pending",
    InProgress => "in_progress",
    Completed  => "completed",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrder {
    pub work_order_id: WorkOrderId,
    pub order_number: String,
    pub product_type: String,
    pub quantity: u32,
    pub start_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub status: WorkOrderStatus,
    pub assigned_operator: Option<OperatorId>,
    pub order_value: f64,
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    /// The scheduled span, `[start, ship]`. Without a ship date the order
    /// occupies its start day only. None when unscheduled.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start_date?;
        Some((start, self.ship_date.unwrap_or(start).max(start)))
    }

    pub fn delivery_month(&self) -> String {
        self.ship_date
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_else(|| UNSCHEDULED_MONTH.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrderItem {
    pub item_id: ItemId,
    pub work_order_id: WorkOrderId,
    pub serial_number: String,
    pub status: ItemStatus,
    /// Position in the product route of the next step to run. Equal to
    /// the route length once every step is completed or skipped.
    pub current_step: u32,
    /// Bumped on every assignment or execution write.
    pub revision: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkOrder {
    pub order_number: String,
    pub product_type: String,
    pub quantity: u32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub ship_date: Option<NaiveDate>,
    #[serde(default)]
    pub order_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkOrderFilter {
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
    #[serde(default)]
    pub product_type: Option<String>,
    /// Case-insensitive match against order number or product type.
    #[serde(default)]
    pub text: Option<String>,
}

impl WorkOrderFilter {
    pub fn matches(&self, wo: &WorkOrder) -> bool {
        if self.status.is_some_and(|s| s != wo.status) {
            return false;
        }
        if self
            .product_type
            .as_deref()
            .is_some_and(|p| p != wo.product_type)
        {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                wo.order_number.to_lowercase().contains(&needle)
                    || wo.product_type.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// Partition by delivery month (`YYYY-MM`, or `unscheduled`).
pub fn group_by_delivery_month(orders: &[WorkOrder]) -> BTreeMap<String, Vec<WorkOrder>> {
    let mut groups: BTreeMap<String, Vec<WorkOrder>> = BTreeMap::new();
    for wo in orders {
        groups.entry(wo.delivery_month()).or_default().push(wo.clone());
    }
    groups
}

pub fn group_by_status(orders: &[WorkOrder]) -> BTreeMap<WorkOrderStatus, Vec<WorkOrder>> {
    let mut groups: BTreeMap<WorkOrderStatus, Vec<WorkOrder>> = BTreeMap::new();
    for wo in orders {
        groups.entry(wo.status).or_default().push(wo.clone());
    }
    groups
}

pub struct WorkOrderBook<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
}

impl<'a> WorkOrderBook<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    /// Create the order and its items. Serial numbers are
    /// `<order_number>-001`, `-002`, ...
    pub fn create(&self, new: NewWorkOrder) -> PlanResult<WorkOrder> {
        if self.config.route(&new.product_type).is_none() {
            return Err(PlanError::not_found("product route", new.product_type));
        }
        if let (Some(start), Some(ship)) = (new.start_date, new.ship_date) {
            if ship < start {
                return Err(PlanError::InvalidSchedule { start, ship });
            }
        }
        check_order_value(new.order_value)?;

        let now = self.clock.now();
        let wo = WorkOrder {
            work_order_id: uuid::Uuid::new_v4().to_string(),
            order_number: new.order_number,
            product_type: new.product_type,
            quantity: new.quantity,
            start_date: new.start_date,
            ship_date: new.ship_date,
            status: WorkOrderStatus::Planned,
            assigned_operator: None,
            order_value: new.order_value,
            created_at: now,
        };

        let txn = self.store.begin_immediate()?;
        self.store.insert_work_order(&wo)?;
        for n in 1..=wo.quantity {
            let item = WorkOrderItem {
                item_id: uuid::Uuid::new_v4().to_string(),
                work_order_id: wo.work_order_id.clone(),
                serial_number: format!("{}-{n:03}", wo.order_number),
                status: ItemStatus::Pending,
                current_step: 0,
                revision: 0,
            };
            self.store.insert_item(&item)?;
        }
        self.store.append_event(
            &PlanEvent::WorkOrderCreated {
                work_order_id: wo.work_order_id.clone(),
                order_number: wo.order_number.clone(),
                product_type: wo.product_type.clone(),
                quantity: wo.quantity,
            },
            now,
        )?;
        txn.commit()?;

        log::info!(
            "Created work order {} ({} x {})",
            wo.order_number,
            wo.quantity,
            wo.product_type
        );
        Ok(wo)
    }

    pub fn get(&self, work_order_id: &str) -> PlanResult<WorkOrder> {
        self.store.get_work_order(work_order_id)
    }

    pub fn by_number(&self, order_number: &str) -> PlanResult<Option<WorkOrder>> {
        self.store.work_order_by_number(order_number)
    }

    pub fn items(&self, work_order_id: &str) -> PlanResult<Vec<WorkOrderItem>> {
        self.store.get_work_order(work_order_id)?;
        self.store.items_for_work_order(work_order_id)
    }

    pub fn list(&self, filter: &WorkOrderFilter) -> PlanResult<Vec<WorkOrder>> {
        let all = self.store.list_work_orders()?;
        log::debug!("Filtering {} work orders", all.len());
        Ok(all.into_iter().filter(|wo| filter.matches(wo)).collect())
    }

    /// Setting both dates to None moves the order to the backlog.
    pub fn set_schedule(
        &self,
        work_order_id: &str,
        start_date: Option<NaiveDate>,
        ship_date: Option<NaiveDate>,
    ) -> PlanResult<WorkOrder> {
        if let (Some(start), Some(ship)) = (start_date, ship_date) {
            if ship < start {
                return Err(PlanError::InvalidSchedule { start, ship });
            }
        }
        let mut wo = self.store.get_work_order(work_order_id)?;
        self.store
            .update_work_order_schedule(work_order_id, start_date, ship_date)?;
        self.store.append_event(
            &PlanEvent::WorkOrderScheduled {
                work_order_id: work_order_id.to_string(),
                start_date,
                ship_date,
            },
            self.clock.now(),
        )?;
        wo.start_date = start_date;
        wo.ship_date = ship_date;
        Ok(wo)
    }

    pub fn set_order_value(&self, work_order_id: &str, order_value: f64) -> PlanResult<()> {
        check_order_value(order_value)?;
        let wo = self.store.get_work_order(work_order_id)?;
        self.store.update_work_order_value(work_order_id, order_value)?;
        self.store.append_event(
            &PlanEvent::WorkOrderValueSet {
                work_order_id: work_order_id.to_string(),
                order_value,
            },
            self.clock.now(),
        )?;
        log::info!("Order value of {} set to {order_value}", wo.order_number);
        Ok(())
    }

    /// Manual status changes are limited to holding and releasing an order.
    /// Progress statuses are driven by step execution.
    pub fn set_status(&self, work_order_id: &str, to: WorkOrderStatus) -> PlanResult<WorkOrder> {
        let mut wo = self.store.get_work_order(work_order_id)?;
        let allowed = matches!(
            (wo.status, to),
            (WorkOrderStatus::Planned, WorkOrderStatus::OnHold)
                | (WorkOrderStatus::InProgress, WorkOrderStatus::OnHold)
                | (WorkOrderStatus::OnHold, WorkOrderStatus::Planned)
        );
        if !allowed {
            return Err(PlanError::InvalidStatusChange {
                work_order_id: work_order_id.to_string(),
                from: wo.status.to_string(),
                to: to.to_string(),
            });
        }
        change_status(self.store, &wo, to, self.clock.now())?;
        wo.status = to;
        Ok(wo)
    }
}

fn check_order_value(value: f64) -> PlanResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PlanError::InvalidOrderValue { value })
    }
}

pub(crate) fn change_status(
    store: &PlanStore,
    wo: &WorkOrder,
    to: WorkOrderStatus,
    at: DateTime<Utc>,
) -> PlanResult<()> {
    if wo.status == to {
        return Ok(());
    }
    store.update_work_order_status(&wo.work_order_id, to)?;
    store.append_event(
        &PlanEvent::WorkOrderStatusChanged {
            work_order_id: wo.work_order_id.clone(),
            from: wo.status,
            to,
        },
        at,
    )?;
    log::info!("Work order {} {} -> {}", wo.order_number, wo.status, to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(number: &str, status: WorkOrderStatus, ship: Option<&str>) -> WorkOrder {
        WorkOrder {
            work_order_id: number.to_lowercase(),
            order_number: number.into(),
            product_type: "controller".into(),
            quantity: 1,
            start_date: None,
            ship_date: ship.map(|s| s.parse().unwrap()),
            status,
            assigned_operator: None,
            order_value: 0.0,
            created_at: DateTime::<Utc>::default(),
        }
    }

    #[test]
    fn filter_text_matches_order_number_case_insensitively() {
        let wo = order("WO-1042", WorkOrderStatus::Planned, None);
        let filter = WorkOrderFilter {
            text: Some("wo-10".into()),
            ..Default::default()
        };
        assert!(filter.matches(&wo));

        let miss = WorkOrderFilter {
            text: Some("sensor".into()),
            ..Default::default()
        };
        assert!(!miss.matches(&wo));
    }

    #[test]
    fn span_without_ship_date_is_the_start_day() {
        let mut wo = order("WO-1", WorkOrderStatus::Planned, None);
        assert_eq!(wo.span(), None);
        let start: NaiveDate = "2025-03-04".parse().unwrap();
        wo.start_date = Some(start);
        assert_eq!(wo.span(), Some((start, start)));
    }

    #[test]
    fn month_groups_put_missing_ship_dates_under_unscheduled() {
        let orders = vec![
            order("A", WorkOrderStatus::Planned, Some("2025-03-30")),
            order("B", WorkOrderStatus::Planned, None),
            order("C", WorkOrderStatus::Completed, Some("2025-04-01")),
        ];
        let groups = group_by_delivery_month(&orders);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[UNSCHEDULED_MONTH][0].order_number, "B");
        assert_eq!(groups["2025-04"][0].order_number, "C");
    }
}
