//! Traceability: everything recorded about one serialized unit, and the
//! global search that finds it.

use crate::{
    assignment::Assignment,
    clock::Clock,
    config::PlannerConfig,
    error::PlanResult,
    execution::{Certificate, ProductionStep, StepExecution},
    store::PlanStore,
    work_order::{WorkOrder, WorkOrderItem},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    pub step: ProductionStep,
    /// None while the step has never been started.
    pub execution: Option<StepExecution>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Traceability {
    pub item: WorkOrderItem,
    pub work_order: WorkOrder,
    /// Every route step in order.
    pub steps: Vec<TraceStep>,
    pub assignments: Vec<Assignment>,
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub work_orders: Vec<WorkOrder>,
    pub items: Vec<WorkOrderItem>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.work_orders.is_empty() && self.items.is_empty()
    }
}

pub struct Genealogy<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
}

impl<'a> Genealogy<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    pub fn trace_serial(&self, serial_number: &str) -> PlanResult<Option<Traceability>> {
        let Some(item) = self.store.item_by_serial(serial_number.trim())? else {
            return Ok(None);
        };
        let work_order = self.store.get_work_order(&item.work_order_id)?;
        let mut executions = self.store.executions_for_item(&item.item_id)?;
        let steps = self
            .store
            .steps_for_product(&work_order.product_type)?
            .into_iter()
            .map(|step| {
                let execution = executions
                    .iter()
                    .position(|e| e.step_id == step.step_id)
                    .map(|i| executions.swap_remove(i));
                TraceStep { step, execution }
            })
            .collect();
        let assignments = self.store.assignments_for_item(&item.item_id)?;
        let certificate = self.store.certificate_for_item(&item.item_id)?;

        Ok(Some(Traceability {
            item,
            work_order,
            steps,
            assignments,
            certificate,
        }))
    }

    /// Search order numbers, product types and serial numbers. Non-empty
    /// terms are remembered in the recent-search list.
    pub fn search(&self, term: &str) -> PlanResult<SearchResults> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchResults::default());
        }
        let results = SearchResults {
            work_orders: self.store.search_work_orders(term)?,
            items: self.store.search_items(term)?,
        };
        self.store
            .push_recent_search(term, self.clock.now(), self.config.recent_search_limit)?;
        log::debug!(
            "Search '{term}': {} orders, {} items",
            results.work_orders.len(),
            results.items.len()
        );
        Ok(results)
    }
}
