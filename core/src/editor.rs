//! Assignment editor: bulk and single-target operator assignment.
//!
//! Every operation validates availability before its first write. A
//! rejected operation writes nothing, not even an audit row. In
//! authoritative mode the check and the writes share one IMMEDIATE
//! transaction, so a concurrent writer cannot slip in between them and a
//! failure part-way leaves no partial assignment behind.

use crate::{
    assignment::{Assignment, AssignmentSummary, AssignmentTarget},
    availability::require_assignable,
    clock::Clock,
    config::PlannerConfig,
    error::{PlanError, PlanResult},
    event::PlanEvent,
    store::PlanStore,
    work_order::{ItemStatus, WorkOrder, WorkOrderItem},
};
use chrono::NaiveDate;
use std::collections::HashSet;

pub struct AssignmentEditor<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
}

impl<'a> AssignmentEditor<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    /// Assign every unfinished item of the order, and each of their
    /// unfinished steps, to `operator_id` on `date`. The order records the
    /// operator as its owner.
    pub fn assign_work_order(
        &self,
        work_order_id: &str,
        operator_id: &str,
        date: NaiveDate,
    ) -> PlanResult<AssignmentSummary> {
        let txn = self.store.begin(self.config.enforcement)?;
        require_assignable(self.store, operator_id, date)?;
        let wo = self.store.get_work_order(work_order_id)?;
        let summary = self.write_order(&wo, operator_id, date)?;
        txn.commit()?;

        log::info!(
            "Assigned {} items of {} to {operator_id} on {date}",
            summary.items,
            wo.order_number
        );
        Ok(summary)
    }

    /// `assign_work_order` across every open order of a product type.
    pub fn assign_product_group(
        &self,
        product_type: &str,
        operator_id: &str,
        date: NaiveDate,
    ) -> PlanResult<AssignmentSummary> {
        if self.config.route(product_type).is_none() {
            return Err(PlanError::not_found("product route", product_type));
        }
        let txn = self.store.begin(self.config.enforcement)?;
        require_assignable(self.store, operator_id, date)?;

        let mut total = AssignmentSummary::default();
        let orders = self.store.open_work_orders_for_product(product_type)?;
        for wo in &orders {
            let s = self.write_order(wo, operator_id, date)?;
            total.targets_written += s.targets_written;
            total.items += s.items;
        }
        txn.commit()?;

        log::info!(
            "Assigned {} {product_type} orders ({} items) to {operator_id} on {date}",
            orders.len(),
            total.items
        );
        Ok(total)
    }

    /// Assign one item, or clear it with `operator_id: None`. When
    /// `expected_revision` is given and the item has moved on since, the
    /// edit is refused with `RevisionConflict`.
    pub fn assign_item(
        &self,
        item_id: &str,
        operator_id: Option<&str>,
        date: NaiveDate,
        expected_revision: Option<i64>,
    ) -> PlanResult<AssignmentSummary> {
        let txn = self.store.begin(self.config.enforcement)?;
        let item = self.store.get_item(item_id)?;
        check_revision(&item, expected_revision)?;

        let target = AssignmentTarget::item(item_id);
        let written = self.write_target(&target, operator_id, date)?;
        let summary = self.single_summary(&item, written)?;
        txn.commit()?;
        Ok(summary)
    }

    pub fn assign_step(
        &self,
        item_id: &str,
        step_id: &str,
        operator_id: Option<&str>,
        date: NaiveDate,
        expected_revision: Option<i64>,
    ) -> PlanResult<AssignmentSummary> {
        let txn = self.store.begin(self.config.enforcement)?;
        let item = self.store.get_item(item_id)?;
        check_revision(&item, expected_revision)?;
        let wo = self.store.get_work_order(&item.work_order_id)?;
        let step = self.store.get_step(step_id)?;
        if step.product_type != wo.product_type {
            return Err(PlanError::not_found(
                "step on route",
                format!("{}/{step_id}", wo.product_type),
            ));
        }

        let target = AssignmentTarget::step(item_id, step_id);
        let written = self.write_target(&target, operator_id, date)?;
        let summary = self.single_summary(&item, written)?;
        txn.commit()?;
        Ok(summary)
    }

    /// Current assignments of an item: item row first, then steps in order.
    pub fn assignments_for_item(&self, item_id: &str) -> PlanResult<Vec<Assignment>> {
        self.store.get_item(item_id)?;
        self.store.assignments_for_item(item_id)
    }

    fn write_order(&self, wo: &WorkOrder, operator_id: &str, date: NaiveDate) -> PlanResult<AssignmentSummary> {
        let steps = self.store.steps_for_product(&wo.product_type)?;
        let now = self.clock.now();
        let mut summary = AssignmentSummary::default();

        for item in self.store.items_for_work_order(&wo.work_order_id)? {
            if item.status == ItemStatus::Completed {
                continue;
            }
            let finished: HashSet<String> = self
                .store
                .executions_for_item(&item.item_id)?
                .into_iter()
                .filter(|e| e.status.is_finished())
                .map(|e| e.step_id)
                .collect();

            self.store.upsert_assignment(&Assignment::new(
                operator_id,
                date,
                AssignmentTarget::item(&item.item_id),
                now,
            ))?;
            summary.targets_written += 1;
            for step in steps.iter().filter(|s| !finished.contains(&s.step_id)) {
                self.store.upsert_assignment(&Assignment::new(
                    operator_id,
                    date,
                    AssignmentTarget::step(&item.item_id, &step.step_id),
                    now,
                ))?;
                summary.targets_written += 1;
            }
            self.store.bump_item_revision(&item.item_id)?;
            summary.items += 1;
        }

        self.store
            .set_work_order_operator(&wo.work_order_id, Some(operator_id))?;
        self.store.append_event(
            &PlanEvent::WorkOrderAssigned {
                work_order_id: wo.work_order_id.clone(),
                operator_id: operator_id.to_string(),
                date,
                items: summary.items,
            },
            now,
        )?;
        Ok(summary)
    }

    /// Returns whether a row was written or removed.
    fn write_target(
        &self,
        target: &AssignmentTarget,
        operator_id: Option<&str>,
        date: NaiveDate,
    ) -> PlanResult<bool> {
        let changed = match operator_id {
            Some(op) => {
                require_assignable(self.store, op, date)?;
                let now = self.clock.now();
                self.store
                    .upsert_assignment(&Assignment::new(op, date, target.clone(), now))?;
                true
            }
            None => self.store.delete_assignment(target)?,
        };
        if !changed {
            return Ok(false);
        }

        self.store.bump_item_revision(target.item_id())?;
        self.store.append_event(
            &PlanEvent::AssignmentWritten {
                item_id: target.item_id().to_string(),
                step_id: target.step_id().map(str::to_string),
                operator_id: operator_id.map(str::to_string),
                date,
            },
            self.clock.now(),
        )?;
        match operator_id {
            Some(op) => log::info!("Assigned {target:?} to {op} on {date}"),
            None => log::info!("Cleared {target:?}"),
        }
        Ok(true)
    }

    fn single_summary(&self, item: &WorkOrderItem, written: bool) -> PlanResult<AssignmentSummary> {
        Ok(AssignmentSummary {
            targets_written: usize::from(written),
            items: 1,
            distinct_step_operators: Some(self.store.distinct_step_operators(&item.item_id)?),
        })
    }
}

fn check_revision(item: &WorkOrderItem, expected: Option<i64>) -> PlanResult<()> {
    match expected {
        Some(expected) if expected != item.revision => {
            log::warn!(
                "Revision conflict on {}: expected {expected}, found {}",
                item.serial_number,
                item.revision
            );
            Err(PlanError::RevisionConflict {
                item_id: item.item_id.clone(),
                expected,
                actual: item.revision,
            })
        }
        _ => Ok(()),
    }
}
