use crate::{
    assignment::AssignmentSummary,
    availability::{AbsenceReason, AvailabilityEntry},
    execution::StepOutcome,
    types::{ItemId, OperatorId, StepId, WorkOrderId},
    work_order::WorkOrder,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every write a client can ask the engine for.
/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlannerCommand {
    // ── Availability ──────────────────────────────
    SetAvailability {
        operator_id: OperatorId,
        date: NaiveDate,
        hours: f64,
        reason: AbsenceReason,
        #[serde(default)]
        note: Option<String>,
    },
    ClearAvailability {
        operator_id: OperatorId,
        date: NaiveDate,
    },

    // ── Assignment editor ─────────────────────────
    AssignWorkOrder {
        work_order_id: WorkOrderId,
        operator_id: OperatorId,
        date: NaiveDate,
    },
    AssignProductGroup {
        product_type: String,
        operator_id: OperatorId,
        date: NaiveDate,
    },
    /// `operator_id: None` clears the item.
    AssignItem {
        item_id: ItemId,
        #[serde(default)]
        operator_id: Option<OperatorId>,
        date: NaiveDate,
        #[serde(default)]
        expected_revision: Option<i64>,
    },
    AssignStep {
        item_id: ItemId,
        step_id: StepId,
        #[serde(default)]
        operator_id: Option<OperatorId>,
        date: NaiveDate,
        #[serde(default)]
        expected_revision: Option<i64>,
    },

    // ── Step execution ────────────────────────────
    StartStep {
        item_id: ItemId,
        step_id: StepId,
        operator_id: OperatorId,
    },
    CompleteStep {
        item_id: ItemId,
        step_id: StepId,
        #[serde(default)]
        operator_id: Option<OperatorId>,
    },
    SkipStep {
        item_id: ItemId,
        step_id: StepId,
        reason: String,
    },

    // ── Work orders ───────────────────────────────
    ScheduleWorkOrder {
        work_order_id: WorkOrderId,
        #[serde(default)]
        start_date: Option<NaiveDate>,
        #[serde(default)]
        ship_date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    AvailabilitySet { entry: AvailabilityEntry },
    AvailabilityCleared { removed: bool },
    Assigned { summary: AssignmentSummary },
    Step { outcome: StepOutcome },
    Scheduled { work_order: WorkOrder },
}
