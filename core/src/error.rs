use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Operator '{operator_id}' is unavailable on {date}: {reason}")]
    OperatorUnavailable {
        operator_id: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("Available hours must be within 0..=24, got {hours}")]
    InvalidHours { hours: f64 },

    #[error("Order value must be a finite amount of at least 0, got {value}")]
    InvalidOrderValue { value: f64 },

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Ship date {ship} precedes start date {start}")]
    InvalidSchedule { start: NaiveDate, ship: NaiveDate },

    #[error("Unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Step '{step_id}' of item '{item_id}' cannot go from {from} to {to}")]
    InvalidTransition {
        item_id: String,
        step_id: String,
        from: String,
        to: String,
    },

    #[error("Step '{step_id}' is not the current step of item '{item_id}' (current position {current})")]
    StepOutOfOrder {
        item_id: String,
        step_id: String,
        current: u32,
    },

    #[error("Work order '{work_order_id}' cannot change status from {from} to {to}")]
    InvalidStatusChange {
        work_order_id: String,
        from: String,
        to: String,
    },

    #[error("Item '{item_id}' was modified: expected revision {expected}, found {actual}")]
    RevisionConflict {
        item_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Session expired; sign in again at {redirect}")]
    SessionExpired { redirect: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PlanResult<T> = Result<T, PlanError>;

impl PlanError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}
