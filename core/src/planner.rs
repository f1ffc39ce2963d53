//! Calendar/planner view: scheduled work orders across a day, week or
//! month window, each day carrying the operators' capacity, plus the
//! backlog of orders with no start date.
//!
//! Overlapping orders are shown side by side. Nothing here detects
//! conflicts between them; see `CapacityAggregator::violations`.

use crate::{
    capacity::{CapacityAggregator, OperatorCapacity},
    config::PlannerConfig,
    error::PlanResult,
    store::PlanStore,
    types::WorkOrderId,
    work_order::WorkOrder,
};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Month,
    Week,
    Day,
}

/// An inclusive date window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarWindow {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarWindow {
    /// The window of the given granularity containing `anchor`. Weeks run
    /// Monday to Sunday.
    pub fn around(anchor: NaiveDate, granularity: Granularity) -> Self {
        let (start, end) = match granularity {
            Granularity::Day => (anchor, anchor),
            Granularity::Week => {
                let start = anchor - Duration::days(anchor.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(6))
            }
            Granularity::Month => {
                let start = anchor - Duration::days(anchor.day0() as i64);
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                (start, end)
            }
        };
        Self { granularity, start, end }
    }

    pub fn next(&self) -> Self {
        Self::around(self.end.succ_opt().unwrap_or(self.end), self.granularity)
    }

    pub fn previous(&self) -> Self {
        Self::around(self.start.pred_opt().unwrap_or(self.start), self.granularity)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerDay {
    pub date: NaiveDate,
    /// Orders whose scheduled span covers this day, by start date.
    pub work_orders: Vec<WorkOrderId>,
    pub capacity: Vec<OperatorCapacity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerView {
    pub window: CalendarWindow,
    pub work_orders: Vec<WorkOrder>,
    pub days: Vec<PlannerDay>,
}

pub struct Planner<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
}

impl<'a> Planner<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig) -> Self {
        Self { store, config }
    }

    pub fn view(&self, window: CalendarWindow) -> PlanResult<PlannerView> {
        let work_orders = self.store.work_orders_in_window(window.start, window.end)?;
        let mut capacity = CapacityAggregator::new(self.store, self.config)
            .capacity_for_range(window.start, window.end, None)?;

        let days = window
            .days()
            .map(|date| PlannerDay {
                date,
                work_orders: work_orders
                    .iter()
                    .filter(|wo| wo.span().is_some_and(|(s, e)| s <= date && date <= e))
                    .map(|wo| wo.work_order_id.clone())
                    .collect(),
                capacity: capacity.remove(&date).unwrap_or_default(),
            })
            .collect();

        log::debug!(
            "Planner {:?} {}..={}: {} orders",
            window.granularity,
            window.start,
            window.end,
            work_orders.len()
        );
        Ok(PlannerView {
            window,
            work_orders,
            days,
        })
    }

    /// Orders with no start date, earliest ship date first; orders with
    /// neither date come last.
    pub fn unscheduled_backlog(&self) -> PlanResult<Vec<WorkOrder>> {
        self.store.unscheduled_work_orders()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn month_window_covers_the_whole_month() {
        let w = CalendarWindow::around(d("2024-02-17"), Granularity::Month);
        assert_eq!(w.start, d("2024-02-01"));
        assert_eq!(w.end, d("2024-02-29"));
        assert_eq!(w.len_days(), 29);
    }

    #[test]
    fn week_window_runs_monday_to_sunday() {
        // 2025-03-06 is a Thursday.
        let w = CalendarWindow::around(d("2025-03-06"), Granularity::Week);
        assert_eq!(w.start, d("2025-03-03"));
        assert_eq!(w.end, d("2025-03-09"));
        assert_eq!(w.days().count(), 7);
    }

    #[test]
    fn next_and_previous_step_one_window() {
        let w = CalendarWindow::around(d("2025-12-15"), Granularity::Month);
        assert_eq!(w.next().start, d("2026-01-01"));
        assert_eq!(w.previous().end, d("2025-11-30"));

        let day = CalendarWindow::around(d("2025-03-31"), Granularity::Day);
        assert_eq!(day.next().start, d("2025-04-01"));
    }
}
