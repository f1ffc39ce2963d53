//! Traceability and global search tests.

use mes_core::{
    engine::MesEngine,
    execution::StepStatus,
    operator::NewOperator,
    work_order::NewWorkOrder,
};

fn plant() -> (MesEngine, String, String) {
    let engine = MesEngine::build_test().unwrap();
    let op = engine
        .roster()
        .register(NewOperator {
            display_name: "Noor Haddad".into(),
            ..Default::default()
        })
        .unwrap()
        .operator_id;
    let wo = engine
        .work_orders()
        .create(NewWorkOrder {
            order_number: "WO-7001".into(),
            product_type: "pressure_sensor".into(),
            quantity: 3,
            start_date: None,
            ship_date: None,
            order_value: 0.0,
        })
        .unwrap();
    (engine, op, wo.work_order_id)
}

/// A trace lists every route step, touched or not, with who did it.
#[test]
fn trace_shows_route_progress_and_operator() {
    let (engine, op, wo_id) = plant();
    let item = engine.work_orders().items(&wo_id).unwrap().remove(1);
    engine.steps().start_step(&item.item_id, "ps.assembly", &op).unwrap();
    engine.steps().complete_step(&item.item_id, "ps.assembly", None).unwrap();
    engine.steps().start_step(&item.item_id, "ps.calibration", &op).unwrap();

    let trace = engine.genealogy().trace_serial("WO-7001-002").unwrap().unwrap();
    assert_eq!(trace.item.item_id, item.item_id);
    assert_eq!(trace.work_order.order_number, "WO-7001");
    assert_eq!(trace.steps.len(), 4);

    let statuses: Vec<Option<StepStatus>> = trace
        .steps
        .iter()
        .map(|s| s.execution.as_ref().map(|e| e.status))
        .collect();
    assert_eq!(
        statuses,
        vec![Some(StepStatus::Completed), Some(StepStatus::InProgress), None, None]
    );
    let done = trace.steps[0].execution.as_ref().unwrap();
    assert_eq!(done.operator_id.as_deref(), Some(op.as_str()));
    assert!(done.finished_at.is_some());
    assert!(trace.certificate.is_none());
}

#[test]
fn unknown_serial_traces_to_nothing() {
    let (engine, _op, _wo) = plant();
    assert!(engine.genealogy().trace_serial("WO-9999-001").unwrap().is_none());
}

#[test]
fn search_finds_orders_and_serials() {
    let (engine, _op, _wo) = plant();
    let genealogy = engine.genealogy();

    let by_order = genealogy.search("wo-7001").unwrap();
    assert_eq!(by_order.work_orders.len(), 1);
    assert_eq!(by_order.items.len(), 3);

    let by_serial = genealogy.search("7001-003").unwrap();
    assert!(by_serial.work_orders.is_empty());
    assert_eq!(by_serial.items.len(), 1);
    assert_eq!(by_serial.items[0].serial_number, "WO-7001-003");

    assert!(genealogy.search("nothing-here").unwrap().is_empty());
}
