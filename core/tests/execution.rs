//! Step execution state machine tests.

use chrono::NaiveDate;
use mes_core::{
    engine::MesEngine,
    error::PlanError,
    execution::{StepOutcome, StepStatus},
    operator::NewOperator,
    work_order::{ItemStatus, NewWorkOrder, WorkOrderItem, WorkOrderStatus},
};

const CONTROLLER_STEPS: [&str; 3] = ["ctl.pcb_mount", "ctl.firmware", "ctl.burn_in"];

struct Fixture {
    engine: MesEngine,
    operator_id: String,
    work_order_id: String,
    items: Vec<WorkOrderItem>,
}

fn fixture(quantity: u32) -> Fixture {
    let engine = MesEngine::build_test().unwrap();
    let operator_id = engine
        .roster()
        .register(NewOperator {
            display_name: "Kai Osei".into(),
            ..Default::default()
        })
        .unwrap()
        .operator_id;
    let wo = engine
        .work_orders()
        .create(NewWorkOrder {
            order_number: "WO-3001".into(),
            product_type: "controller".into(),
            quantity,
            start_date: "2025-03-10".parse::<NaiveDate>().ok(),
            ship_date: None,
            order_value: 0.0,
        })
        .unwrap();
    let items = engine.work_orders().items(&wo.work_order_id).unwrap();
    Fixture {
        engine,
        operator_id,
        work_order_id: wo.work_order_id,
        items,
    }
}

fn run_route(f: &Fixture, item_id: &str) -> StepOutcome {
    let mut last = StepOutcome::AlreadyCompleted;
    for step in CONTROLLER_STEPS {
        f.engine.steps().start_step(item_id, step, &f.operator_id).unwrap();
        last = f.engine.steps().complete_step(item_id, step, None).unwrap();
    }
    last
}

#[test]
fn starting_moves_item_and_order_into_progress() {
    let f = fixture(2);
    let item = &f.items[0];

    let outcome = f
        .engine
        .steps()
        .start_step(&item.item_id, CONTROLLER_STEPS[0], &f.operator_id)
        .unwrap();
    assert_eq!(outcome, StepOutcome::Started);

    let execs = f.engine.steps().executions(&item.item_id).unwrap();
    assert_eq!(execs.len(), 1);
    assert_eq!(execs[0].status, StepStatus::InProgress);
    assert_eq!(execs[0].operator_id.as_deref(), Some(f.operator_id.as_str()));
    assert!(execs[0].started_at.is_some());

    let items = f.engine.work_orders().items(&f.work_order_id).unwrap();
    assert_eq!(items[0].status, ItemStatus::InProgress);
    assert_eq!(items[1].status, ItemStatus::Pending);
    let wo = f.engine.work_orders().get(&f.work_order_id).unwrap();
    assert_eq!(wo.status, WorkOrderStatus::InProgress);
}

/// Only the current step may start.
#[test]
fn later_step_cannot_start_first() {
    let f = fixture(1);
    let err = f
        .engine
        .steps()
        .start_step(&f.items[0].item_id, CONTROLLER_STEPS[1], &f.operator_id);
    assert!(matches!(err, Err(PlanError::StepOutOfOrder { current: 0, .. })));
}

#[test]
fn pending_step_cannot_be_completed_or_skipped() {
    let f = fixture(1);
    let item_id = &f.items[0].item_id;
    let steps = f.engine.steps();

    assert!(matches!(
        steps.complete_step(item_id, CONTROLLER_STEPS[0], None),
        Err(PlanError::InvalidTransition { .. })
    ));
    assert!(matches!(
        steps.skip_step(item_id, CONTROLLER_STEPS[0], "no fixture"),
        Err(PlanError::InvalidTransition { .. })
    ));
}

/// No reverse transitions: a finished step cannot restart.
#[test]
fn finished_step_cannot_restart() {
    let f = fixture(1);
    let item_id = &f.items[0].item_id;
    let steps = f.engine.steps();
    steps.start_step(item_id, CONTROLLER_STEPS[0], &f.operator_id).unwrap();
    steps.complete_step(item_id, CONTROLLER_STEPS[0], None).unwrap();

    let err = steps.start_step(item_id, CONTROLLER_STEPS[0], &f.operator_id);
    assert!(matches!(err, Err(PlanError::InvalidTransition { .. })));
    let err = steps.skip_step(item_id, CONTROLLER_STEPS[0], "late");
    assert!(matches!(err, Err(PlanError::InvalidTransition { .. })));
}

/// A retried completion reports AlreadyCompleted and writes nothing.
#[test]
fn completing_twice_is_idempotent() {
    let f = fixture(1);
    let item_id = &f.items[0].item_id;
    let steps = f.engine.steps();
    steps.start_step(item_id, CONTROLLER_STEPS[0], &f.operator_id).unwrap();
    let first = steps.complete_step(item_id, CONTROLLER_STEPS[0], None).unwrap();
    assert!(matches!(first, StepOutcome::Completed { item_completed: false, .. }));

    let events = f.engine.event_count().unwrap();
    let rows = f.engine.store().execution_count(item_id).unwrap();
    let item_before = f.engine.work_orders().items(&f.work_order_id).unwrap().remove(0);

    let again = steps.complete_step(item_id, CONTROLLER_STEPS[0], None).unwrap();
    assert_eq!(again, StepOutcome::AlreadyCompleted);
    assert_eq!(f.engine.event_count().unwrap(), events);
    assert_eq!(f.engine.store().execution_count(item_id).unwrap(), rows);
    let item_after = f.engine.work_orders().items(&f.work_order_id).unwrap().remove(0);
    assert_eq!(item_after.current_step, item_before.current_step);
    assert_eq!(item_after.current_step, 1);
}

/// Finishing the last step completes the item and issues exactly one
/// certificate.
#[test]
fn last_step_completes_item_and_issues_certificate() {
    let f = fixture(2);
    let item = &f.items[0];

    let last = run_route(&f, &item.item_id);
    let StepOutcome::Completed {
        item_completed,
        work_order_completed,
        certificate,
    } = last
    else {
        panic!("expected Completed, got {last:?}");
    };
    assert!(item_completed);
    assert!(!work_order_completed, "second item still open");
    let cert = certificate.expect("certificate issued");
    assert_eq!(cert.certificate_number, format!("QC-{}", item.serial_number));

    let stored = f.engine.steps().certificate(&item.item_id).unwrap().unwrap();
    assert_eq!(stored.certificate_id, cert.certificate_id);
    let again = f
        .engine
        .steps()
        .complete_step(&item.item_id, CONTROLLER_STEPS[2], None)
        .unwrap();
    assert_eq!(again, StepOutcome::AlreadyCompleted);
    assert_eq!(
        f.engine.store().certificates_for_work_order(&f.work_order_id).unwrap().len(),
        1
    );
}

#[test]
fn work_order_completes_with_its_last_item() {
    let f = fixture(2);
    run_route(&f, &f.items[0].item_id);
    let last = run_route(&f, &f.items[1].item_id);
    assert!(matches!(last, StepOutcome::Completed { work_order_completed: true, .. }));

    let wo = f.engine.work_orders().get(&f.work_order_id).unwrap();
    assert_eq!(wo.status, WorkOrderStatus::Completed);
    let items = f.engine.work_orders().items(&f.work_order_id).unwrap();
    assert!(items.iter().all(|i| i.status == ItemStatus::Completed));
}

/// Skipping advances like completing and keeps the reason.
#[test]
fn skipping_advances_and_records_reason() {
    let f = fixture(1);
    let item_id = &f.items[0].item_id;
    let steps = f.engine.steps();

    steps.start_step(item_id, CONTROLLER_STEPS[0], &f.operator_id).unwrap();
    steps.complete_step(item_id, CONTROLLER_STEPS[0], None).unwrap();
    steps.start_step(item_id, CONTROLLER_STEPS[1], &f.operator_id).unwrap();
    let outcome = steps
        .skip_step(item_id, CONTROLLER_STEPS[1], "firmware preloaded")
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Skipped { item_completed: false, .. }));

    steps.start_step(item_id, CONTROLLER_STEPS[2], &f.operator_id).unwrap();
    let outcome = steps.skip_step(item_id, CONTROLLER_STEPS[2], "burn-in rig down").unwrap();
    assert!(matches!(
        outcome,
        StepOutcome::Skipped {
            item_completed: true,
            work_order_completed: true
        }
    ));

    let execs = steps.executions(item_id).unwrap();
    assert_eq!(execs.len(), 3);
    assert_eq!(execs[1].status, StepStatus::Skipped);
    assert_eq!(execs[1].notes.as_deref(), Some("firmware preloaded"));
}

/// Completed items are left alone by bulk assignment.
#[test]
fn completed_items_are_skipped_by_work_order_assignment() {
    let f = fixture(2);
    run_route(&f, &f.items[0].item_id);

    let summary = f
        .engine
        .editor()
        .assign_work_order(&f.work_order_id, &f.operator_id, "2025-03-11".parse().unwrap())
        .unwrap();
    assert_eq!(summary.items, 1);
    assert!(f
        .engine
        .editor()
        .assignments_for_item(&f.items[0].item_id)
        .unwrap()
        .is_empty());
}
