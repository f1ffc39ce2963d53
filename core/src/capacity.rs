//! Capacity aggregator.
//!
//! For a date or a window: per schedulable operator, whether they are
//! unavailable that day and how much work they hold. One availability
//! query and one assignment query per call, grouped in memory.

use crate::{
    assignment::Assignment,
    availability::{AbsenceReason, AvailabilityEntry},
    config::PlannerConfig,
    error::{PlanError, PlanResult},
    operator::Operator,
    store::PlanStore,
    types::{ItemId, OperatorId, StepId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unavailability {
    /// Zero-hour availability entry for the day.
    Absent {
        reason: AbsenceReason,
        note: Option<String>,
    },
    /// The operator's profile flag is off.
    Flagged,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Free,
    Normal,
    Overbooked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatorCapacity {
    pub operator_id: OperatorId,
    pub display_name: String,
    pub date: NaiveDate,
    pub hours_available: f64,
    pub unavailable: Option<Unavailability>,
    /// Assignment rows (item and step level) dated this day.
    pub assignment_count: usize,
    /// Distinct items those rows touch.
    pub item_count: usize,
    pub load: LoadLevel,
}

impl OperatorCapacity {
    pub fn is_unavailable(&self) -> bool {
        self.unavailable.is_some()
    }
}

/// An assignment sitting on a day its operator cannot work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityViolation {
    pub operator_id: OperatorId,
    pub date: NaiveDate,
    pub item_id: ItemId,
    pub step_id: Option<StepId>,
    pub unavailable: Unavailability,
}

pub struct CapacityAggregator<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
}

impl<'a> CapacityAggregator<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig) -> Self {
        Self { store, config }
    }

    /// `operators: None` means every schedulable operator.
    pub fn capacity_for_date(
        &self,
        date: NaiveDate,
        operators: Option<&[OperatorId]>,
    ) -> PlanResult<Vec<OperatorCapacity>> {
        let mut range = self.capacity_for_range(date, date, operators)?;
        Ok(range.remove(&date).unwrap_or_default())
    }

    pub fn capacity_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        operators: Option<&[OperatorId]>,
    ) -> PlanResult<BTreeMap<NaiveDate, Vec<OperatorCapacity>>> {
        if start > end {
            return Err(PlanError::InvalidRange { start, end });
        }
        let roster = self.roster(operators)?;
        let availability = self.store.availability_in_range(start, end)?;
        let assignments = self.store.assignments_in_range(start, end)?;

        let entries: HashMap<(&str, NaiveDate), &AvailabilityEntry> = availability
            .iter()
            .map(|e| ((e.operator_id.as_str(), e.date), e))
            .collect();
        let mut work: HashMap<(&str, NaiveDate), Vec<&Assignment>> = HashMap::new();
        for a in &assignments {
            work.entry((a.operator_id.as_str(), a.work_date))
                .or_default()
                .push(a);
        }

        let mut out = BTreeMap::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            let day: Vec<OperatorCapacity> = roster
                .iter()
                .map(|op| {
                    let key = (op.operator_id.as_str(), date);
                    let held = work.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                    self.operator_day(op, date, entries.get(&key).copied(), held)
                })
                .collect();
            out.insert(date, day);
        }
        Ok(out)
    }

    /// Assignments in the window that break the "no work on an absent
    /// day" rule. Authoritative mode prevents new ones; this finds rows
    /// written in advisory mode or before an absence was recorded.
    pub fn violations(&self, start: NaiveDate, end: NaiveDate) -> PlanResult<Vec<CapacityViolation>> {
        if start > end {
            return Err(PlanError::InvalidRange { start, end });
        }
        let operators: HashMap<OperatorId, Operator> = self
            .store
            .list_operators()?
            .into_iter()
            .map(|o| (o.operator_id.clone(), o))
            .collect();
        let availability = self.store.availability_in_range(start, end)?;
        let entries: HashMap<(&str, NaiveDate), &AvailabilityEntry> = availability
            .iter()
            .map(|e| ((e.operator_id.as_str(), e.date), e))
            .collect();

        let mut out = Vec::new();
        for a in self.store.assignments_in_range(start, end)? {
            let Some(op) = operators.get(&a.operator_id) else {
                continue;
            };
            let entry = entries.get(&(a.operator_id.as_str(), a.work_date)).copied();
            if let Some(unavailable) = unavailability(op, entry) {
                out.push(CapacityViolation {
                    operator_id: a.operator_id.clone(),
                    date: a.work_date,
                    item_id: a.target.item_id().to_string(),
                    step_id: a.target.step_id().map(str::to_string),
                    unavailable,
                });
            }
        }
        if !out.is_empty() {
            log::warn!("{} assignments on unavailable days in {start}..={end}", out.len());
        }
        Ok(out)
    }

    fn roster(&self, operators: Option<&[OperatorId]>) -> PlanResult<Vec<Operator>> {
        let all = self.store.schedulable_operators()?;
        Ok(match operators {
            None => all,
            Some(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                all.into_iter()
                    .filter(|o| wanted.contains(o.operator_id.as_str()))
                    .collect()
            }
        })
    }

    fn operator_day(
        &self,
        op: &Operator,
        date: NaiveDate,
        entry: Option<&AvailabilityEntry>,
        held: &[&Assignment],
    ) -> OperatorCapacity {
        let unavailable = unavailability(op, entry);
        let hours_available = match (&unavailable, entry) {
            (Some(_), _) => 0.0,
            (None, Some(e)) => e.hours,
            (None, None) => op.daily_capacity_hours,
        };
        let item_count = held
            .iter()
            .map(|a| a.target.item_id())
            .collect::<HashSet<_>>()
            .len();
        let load = if held.is_empty() {
            LoadLevel::Free
        } else if held.len() > self.config.max_daily_assignments as usize {
            LoadLevel::Overbooked
        } else {
            LoadLevel::Normal
        };
        OperatorCapacity {
            operator_id: op.operator_id.clone(),
            display_name: op.display_name.clone(),
            date,
            hours_available,
            unavailable,
            assignment_count: held.len(),
            item_count,
            load,
        }
    }
}

fn unavailability(op: &Operator, entry: Option<&AvailabilityEntry>) -> Option<Unavailability> {
    if !op.is_available {
        return Some(Unavailability::Flagged);
    }
    entry.filter(|e| e.is_absent()).map(|e| Unavailability::Absent {
        reason: e.reason,
        note: e.note.clone(),
    })
}
