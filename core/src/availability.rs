//! Availability store: how many hours an operator can work on a given day.
//!
//! One entry per (operator, date). Setting an entry again replaces it.
//! Zero hours is a full-day absence. Days with no entry fall back to the
//! operator's default daily capacity.

use crate::{
    clock::Clock,
    error::{PlanError, PlanResult},
    event::PlanEvent,
    operator::{check_hours, Operator},
    store::PlanStore,
    types::{text_enum, OperatorId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceReason {
    Holiday,
    Sick,
    Training,
    Other,
}

text_enum!(AbsenceReason, "absence reason" {
    Holiday  => "holiday",
    Sick     => "sick",
    Training => "training",
    Other    => "other",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityEntry {
    pub operator_id: OperatorId,
    pub date: NaiveDate,
    pub hours: f64,
    pub reason: AbsenceReason,
    pub note: Option<String>,
}

impl AvailabilityEntry {
    pub fn is_absent(&self) -> bool {
        self.hours <= 0.0
    }

    /// "sick", or "sick (flu)" when a note is present.
    pub fn describe(&self) -> String {
        match &self.note {
            Some(note) if !note.trim().is_empty() => format!("{} ({})", self.reason, note.trim()),
            _ => self.reason.to_string(),
        }
    }
}

pub struct AvailabilityBook<'a> {
    store: &'a PlanStore,
    clock: &'a dyn Clock,
}

impl<'a> AvailabilityBook<'a> {
    pub fn new(store: &'a PlanStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn set(
        &self,
        operator_id: &str,
        date: NaiveDate,
        hours: f64,
        reason: AbsenceReason,
        note: Option<String>,
    ) -> PlanResult<AvailabilityEntry> {
        check_hours(hours)?;
        self.store.get_operator(operator_id)?;

        let entry = AvailabilityEntry {
            operator_id: operator_id.to_string(),
            date,
            hours,
            reason,
            note,
        };
        let now = self.clock.now();
        self.store.upsert_availability(&entry, now)?;
        self.store.append_event(
            &PlanEvent::AvailabilitySet {
                operator_id: entry.operator_id.clone(),
                date,
                hours,
                reason,
            },
            now,
        )?;
        log::info!("Availability for {operator_id} on {date}: {hours}h ({reason})");
        Ok(entry)
    }

    /// Returns false when there was nothing to clear.
    pub fn clear(&self, operator_id: &str, date: NaiveDate) -> PlanResult<bool> {
        self.store.get_operator(operator_id)?;
        let removed = self.store.delete_availability(operator_id, date)?;
        if removed {
            self.store.append_event(
                &PlanEvent::AvailabilityCleared {
                    operator_id: operator_id.to_string(),
                    date,
                },
                self.clock.now(),
            )?;
        }
        Ok(removed)
    }

    pub fn on(&self, operator_id: &str, date: NaiveDate) -> PlanResult<Option<AvailabilityEntry>> {
        self.store.get_operator(operator_id)?;
        self.store.availability_on(operator_id, date)
    }

    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> PlanResult<Vec<AvailabilityEntry>> {
        if start > end {
            return Err(PlanError::InvalidRange { start, end });
        }
        self.store.availability_in_range(start, end)
    }
}

/// Why `operator` may not take work on `date`, if anything.
pub(crate) fn blocking_reason(
    operator: &Operator,
    entry: Option<&AvailabilityEntry>,
) -> Option<String> {
    if !operator.is_available {
        return Some("flagged unavailable".to_string());
    }
    entry.filter(|e| e.is_absent()).map(AvailabilityEntry::describe)
}

/// Load the operator and reject them when they are unavailable on `date`.
pub(crate) fn require_assignable(
    store: &PlanStore,
    operator_id: &str,
    date: NaiveDate,
) -> PlanResult<Operator> {
    let operator = store.get_operator(operator_id)?;
    let entry = store.availability_on(operator_id, date)?;
    if let Some(reason) = blocking_reason(&operator, entry.as_ref()) {
        log::warn!("Rejected assignment of {operator_id} on {date}: {reason}");
        return Err(PlanError::OperatorUnavailable {
            operator_id: operator_id.to_string(),
            date,
            reason,
        });
    }
    Ok(operator)
}
