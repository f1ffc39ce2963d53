//! Demo plant seeding: operators, absences, work orders and a first round
//! of assignments, all derived from one seed.

use crate::{
    availability::AbsenceReason,
    engine::MesEngine,
    error::{PlanError, PlanResult},
    name_generator::NameGenerator,
    operator::NewOperator,
    planner::{CalendarWindow, Granularity},
    rng::{DemoRng, DemoStream},
    work_order::NewWorkOrder,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DemoPlan {
    pub operators: usize,
    pub work_orders: usize,
}

impl Default for DemoPlan {
    fn default() -> Self {
        Self {
            operators: 8,
            work_orders: 24,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemoSummary {
    pub operators: usize,
    pub absences: usize,
    pub work_orders: usize,
    pub scheduled: usize,
    pub assigned: usize,
    /// Assignments refused because the operator was absent that day.
    pub rejected: usize,
}

const ABSENCE_REASONS: &[AbsenceReason] = &[
    AbsenceReason::Holiday,
    AbsenceReason::Sick,
    AbsenceReason::Training,
    AbsenceReason::Other,
];

const CAPACITY_HOURS: &[f64] = &[6.0, 7.5, 8.0, 8.0];

/// Seed the month around `anchor`.
pub fn seed_demo_plant(
    engine: &MesEngine,
    seed: u64,
    anchor: NaiveDate,
    plan: DemoPlan,
) -> PlanResult<DemoSummary> {
    let month = CalendarWindow::around(anchor, Granularity::Month);
    let mut summary = DemoSummary::default();

    let mut rng = DemoRng::new(seed, DemoStream::Operators);
    let mut operator_ids = Vec::with_capacity(plan.operators);
    for _ in 0..plan.operators {
        let name = NameGenerator::generate_full_name(&mut rng);
        let op = engine.roster().register(NewOperator {
            avatar_url: Some(NameGenerator::avatar_for(&name)),
            display_name: name,
            daily_capacity_hours: Some(*rng.pick(CAPACITY_HOURS)),
        })?;
        operator_ids.push(op.operator_id);
    }
    summary.operators = operator_ids.len();

    let mut rng = DemoRng::new(seed, DemoStream::Availability);
    let availability = engine.availability();
    for op in &operator_ids {
        for date in month.days() {
            if rng.chance(0.05) {
                let reason = *rng.pick(ABSENCE_REASONS);
                availability.set(op, date, 0.0, reason, None)?;
                summary.absences += 1;
            } else if rng.chance(0.04) {
                availability.set(op, date, 4.0, AbsenceReason::Training, Some("half day".into()))?;
            }
        }
    }

    let mut product_types: Vec<&str> = engine.config().routes.keys().map(String::as_str).collect();
    product_types.sort_unstable();
    if product_types.is_empty() {
        return Ok(summary);
    }

    let mut rng = DemoRng::new(seed, DemoStream::WorkOrders);
    let mut scheduled = Vec::new();
    for i in 0..plan.work_orders {
        let product_type = *rng.pick(&product_types);
        let quantity = 1 + rng.next_u64_below(5) as u32;
        let (start_date, ship_date) = if rng.chance(0.8) {
            let start = month.start + Duration::days(rng.next_u64_below(month.len_days() as u64) as i64);
            let ship = start + Duration::days(2 + rng.next_u64_below(9) as i64);
            (Some(start), Some(ship))
        } else if rng.chance(0.5) {
            (None, Some(month.end + Duration::days(rng.next_u64_below(30) as i64)))
        } else {
            (None, None)
        };
        let wo = engine.work_orders().create(NewWorkOrder {
            order_number: format!("WO-{:04}", 1000 + i),
            product_type: product_type.to_string(),
            quantity,
            start_date,
            ship_date,
            order_value: quantity as f64 * 150.0,
        })?;
        if let Some(start) = start_date {
            scheduled.push((wo.work_order_id, start));
        }
    }
    summary.work_orders = plan.work_orders;
    summary.scheduled = scheduled.len();

    if operator_ids.is_empty() {
        return Ok(summary);
    }
    let mut rng = DemoRng::new(seed, DemoStream::Assignments);
    let editor = engine.editor();
    for (work_order_id, start) in &scheduled {
        if !rng.chance(0.7) {
            continue;
        }
        let op = rng.pick(&operator_ids);
        match editor.assign_work_order(work_order_id, op, *start) {
            Ok(_) => summary.assigned += 1,
            Err(PlanError::OperatorUnavailable { .. }) => summary.rejected += 1,
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Seeded demo plant: {} operators, {} orders ({} scheduled, {} assigned, {} rejected)",
        summary.operators,
        summary.work_orders,
        summary.scheduled,
        summary.assigned,
        summary.rejected
    );
    Ok(summary)
}
