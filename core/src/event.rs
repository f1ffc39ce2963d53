//! The audit trail. Every successful mutation appends one `PlanEvent`.
//! Rejected operations append nothing.

use crate::{
    availability::AbsenceReason,
    operator::Role,
    types::{ItemId, OperatorId, StepId, WorkOrderId},
    work_order::WorkOrderStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Variants are appended, never removed or reordered: the tag is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    // ── Operators ─────────────────────────────────
    OperatorRegistered {
        operator_id: OperatorId,
        display_name: String,
    },
    OperatorAvailabilityFlagged {
        operator_id: OperatorId,
        is_available: bool,
    },
    RoleGranted {
        operator_id: OperatorId,
        role: Role,
    },
    RoleRevoked {
        operator_id: OperatorId,
        role: Role,
    },

    // ── Availability ──────────────────────────────
    AvailabilitySet {
        operator_id: OperatorId,
        date: NaiveDate,
        hours: f64,
        reason: AbsenceReason,
    },
    AvailabilityCleared {
        operator_id: OperatorId,
        date: NaiveDate,
    },

    // ── Work orders ───────────────────────────────
    WorkOrderCreated {
        work_order_id: WorkOrderId,
        order_number: String,
        product_type: String,
        quantity: u32,
    },
    WorkOrderScheduled {
        work_order_id: WorkOrderId,
        start_date: Option<NaiveDate>,
        ship_date: Option<NaiveDate>,
    },
    WorkOrderStatusChanged {
        work_order_id: WorkOrderId,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },

    // ── Assignments ───────────────────────────────
    WorkOrderAssigned {
        work_order_id: WorkOrderId,
        operator_id: OperatorId,
        date: NaiveDate,
        items: usize,
    },
    /// `operator_id: None` means the target was cleared.
    AssignmentWritten {
        item_id: ItemId,
        step_id: Option<StepId>,
        operator_id: Option<OperatorId>,
        date: NaiveDate,
    },

    // ── Execution ─────────────────────────────────
    StepStarted {
        item_id: ItemId,
        step_id: StepId,
        operator_id: OperatorId,
    },
    StepCompleted {
        item_id: ItemId,
        step_id: StepId,
        operator_id: Option<OperatorId>,
    },
    StepSkipped {
        item_id: ItemId,
        step_id: StepId,
        reason: String,
    },
    ItemCompleted {
        item_id: ItemId,
        work_order_id: WorkOrderId,
    },
    CertificateIssued {
        certificate_id: String,
        item_id: ItemId,
        certificate_number: String,
    },

    OperatorProfileUpdated {
        operator_id: OperatorId,
        display_name: String,
        daily_capacity_hours: f64,
    },
    WorkOrderValueSet {
        work_order_id: WorkOrderId,
        order_value: f64,
    },
}

impl PlanEvent {
    /// Stable name stored in the event_type column.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OperatorRegistered { .. }          => "operator_registered",
            Self::OperatorAvailabilityFlagged { .. } => "operator_availability_flagged",
            Self::RoleGranted { .. }                 => "role_granted",
            Self::RoleRevoked { .. }                 => "role_revoked",
            Self::AvailabilitySet { .. }             => "availability_set",
            Self::AvailabilityCleared { .. }         => "availability_cleared",
            Self::WorkOrderCreated { .. }            => "work_order_created",
            Self::WorkOrderScheduled { .. }          => "work_order_scheduled",
            Self::WorkOrderStatusChanged { .. }      => "work_order_status_changed",
            Self::WorkOrderAssigned { .. }           => "work_order_assigned",
            Self::AssignmentWritten { .. }           => "assignment_written",
            Self::StepStarted { .. }                 => "step_started",
            Self::StepCompleted { .. }               => "step_completed",
            Self::StepSkipped { .. }                 => "step_skipped",
            Self::ItemCompleted { .. }               => "item_completed",
            Self::CertificateIssued { .. }           => "certificate_issued",
            Self::OperatorProfileUpdated { .. }      => "operator_profile_updated",
            Self::WorkOrderValueSet { .. }           => "work_order_value_set",
        }
    }

    /// The row the event is filed under: operator, work order, or item.
    pub fn entity_id(&self) -> &str {
        match self {
            Self::OperatorRegistered { operator_id, .. }
            | Self::OperatorAvailabilityFlagged { operator_id, .. }
            | Self::RoleGranted { operator_id, .. }
            | Self::RoleRevoked { operator_id, .. }
            | Self::AvailabilitySet { operator_id, .. }
            | Self::AvailabilityCleared { operator_id, .. }
            | Self::OperatorProfileUpdated { operator_id, .. } => operator_id,
            Self::WorkOrderCreated { work_order_id, .. }
            | Self::WorkOrderScheduled { work_order_id, .. }
            | Self::WorkOrderStatusChanged { work_order_id, .. }
            | Self::WorkOrderAssigned { work_order_id, .. }
            | Self::WorkOrderValueSet { work_order_id, .. } => work_order_id,
            Self::AssignmentWritten { item_id, .. }
            | Self::StepStarted { item_id, .. }
            | Self::StepCompleted { item_id, .. }
            | Self::StepSkipped { item_id, .. }
            | Self::ItemCompleted { item_id, .. }
            | Self::CertificateIssued { item_id, .. } => item_id,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub entity_id: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PlanEvent
    pub created_at: DateTime<Utc>,
}

impl EventLogEntry {
    pub fn event(&self) -> serde_json::Result<PlanEvent> {
        serde_json::from_str(&self.payload)
    }
}
