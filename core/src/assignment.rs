//! Assignment records: an operator is responsible for an item, or for one
//! step of an item, on a work date.
//!
//! Each target has at most one assignee; writing a target again replaces
//! the previous row. An operator may hold any number of targets per day.

use crate::types::{ItemId, OperatorId, StepId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentTarget {
    Item { item_id: ItemId },
    Step { item_id: ItemId, step_id: StepId },
}

impl AssignmentTarget {
    pub fn item(item_id: impl Into<ItemId>) -> Self {
        Self::Item { item_id: item_id.into() }
    }

    pub fn step(item_id: impl Into<ItemId>, step_id: impl Into<StepId>) -> Self {
        Self::Step {
            item_id: item_id.into(),
            step_id: step_id.into(),
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            Self::Item { item_id } | Self::Step { item_id, .. } => item_id,
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::Item { .. } => None,
            Self::Step { step_id, .. } => Some(step_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub assignment_id: String,
    pub operator_id: OperatorId,
    pub work_date: NaiveDate,
    pub target: AssignmentTarget,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(
        operator_id: impl Into<OperatorId>,
        work_date: NaiveDate,
        target: AssignmentTarget,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            assignment_id: uuid::Uuid::new_v4().to_string(),
            operator_id: operator_id.into(),
            work_date,
            target,
            created_at,
        }
    }
}

/// The effect of one editor operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentSummary {
    /// Item-level and step-level rows written or cleared.
    pub targets_written: usize,
    /// Distinct items touched.
    pub items: usize,
    /// For single item/step edits: how many distinct operators now hold
    /// the item's steps.
    pub distinct_step_operators: Option<usize>,
}
