//! Demo seeding is a pure function of the seed.
//!
//! Ids are random uuids, so plants are compared by what a planner sees:
//! names, order numbers, schedules and who got assigned where.

use chrono::NaiveDate;
use mes_core::{
    demo::{seed_demo_plant, DemoPlan, DemoSummary},
    engine::MesEngine,
    work_order::WorkOrderFilter,
};
use std::collections::HashMap;

type Fingerprint = (
    DemoSummary,
    Vec<String>,
    Vec<(String, String, Option<NaiveDate>, Option<NaiveDate>, Option<String>)>,
);

fn anchor() -> NaiveDate {
    "2025-03-10".parse().unwrap()
}

fn fingerprint(seed: u64) -> Fingerprint {
    let engine = MesEngine::build_test().unwrap();
    let summary = seed_demo_plant(&engine, seed, anchor(), DemoPlan::default()).unwrap();

    let operators = engine.roster().all().unwrap();
    let names: HashMap<String, String> = operators
        .iter()
        .map(|o| (o.operator_id.clone(), o.display_name.clone()))
        .collect();
    let mut roster: Vec<String> = operators.into_iter().map(|o| o.display_name).collect();
    roster.sort();

    let orders = engine
        .work_orders()
        .list(&WorkOrderFilter::default())
        .unwrap()
        .into_iter()
        .map(|wo| {
            let owner = wo.assigned_operator.as_ref().and_then(|id| names.get(id).cloned());
            (wo.order_number, wo.product_type, wo.start_date, wo.ship_date, owner)
        })
        .collect();
    (summary, roster, orders)
}

#[test]
fn same_seed_produces_the_same_plant() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    let a = fingerprint(SEED);
    let b = fingerprint(SEED);

    assert_eq!(a.0, b.0, "summaries differ");
    assert_eq!(a.1, b.1, "operator names differ");
    assert_eq!(a.2.len(), b.2.len());
    for (i, (x, y)) in a.2.iter().zip(b.2.iter()).enumerate() {
        assert_eq!(x, y, "work order {i} diverged");
    }
}

#[test]
fn different_seeds_produce_different_plants() {
    assert_ne!(fingerprint(1), fingerprint(2));
}

/// Demo assignments never land on an absent day.
#[test]
fn demo_plant_has_no_capacity_violations() {
    let engine = MesEngine::build_test().unwrap();
    let plan = DemoPlan {
        operators: 6,
        work_orders: 40,
    };
    let summary = seed_demo_plant(&engine, 7, anchor(), plan).unwrap();
    assert_eq!(summary.operators, 6);
    assert_eq!(summary.work_orders, 40);
    assert!(summary.assigned + summary.rejected <= summary.scheduled);

    let start: NaiveDate = "2025-03-01".parse().unwrap();
    let end: NaiveDate = "2025-03-31".parse().unwrap();
    assert!(engine.capacity().violations(start, end).unwrap().is_empty());
}
