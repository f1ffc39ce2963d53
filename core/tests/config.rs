//! Shipped configuration under data/ loads and drives a file-backed engine.

use mes_core::{
    clock::SystemClock,
    config::{EnforcementMode, PlannerConfig},
    engine::MesEngine,
    error::PlanError,
    execution::StepOutcome,
    operator::NewOperator,
    store::PlanStore,
    work_order::NewWorkOrder,
};
use std::sync::Arc;

fn temp_db() -> String {
    let path = std::env::temp_dir().join(format!("mes-{}.db", uuid::Uuid::new_v4()));
    path.to_string_lossy().to_string()
}

fn remove_db(db: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{db}{suffix}"));
    }
}

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

#[test]
fn shipped_config_loads() {
    let config = PlannerConfig::load(DATA_DIR).unwrap();
    assert_eq!(config.enforcement, EnforcementMode::Authoritative);
    assert_eq!(config.session_timeout_hours, 12);
    assert_eq!(config.login_route, "/login");
    assert_eq!(config.routes.len(), 3);
    assert_eq!(config.route("temperature_sensor").map(|r| r.steps.len()), Some(4));
}

#[test]
fn missing_data_dir_names_the_path() {
    let err = PlannerConfig::load("/nonexistent/mes-data").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/mes-data/planner/planner_config.json"));
}

/// Reopening the database file sees the same rows; migrations rerun cleanly.
#[test]
fn file_database_survives_reopen() {
    let db = temp_db();

    {
        let engine = MesEngine::build(&db, DATA_DIR).unwrap();
        engine
            .roster()
            .register(mes_core::operator::NewOperator {
                display_name: "Vera Holm".into(),
                ..Default::default()
            })
            .unwrap();
    }
    let engine = MesEngine::build(&db, DATA_DIR).unwrap();
    let names: Vec<String> = engine
        .roster()
        .all()
        .unwrap()
        .into_iter()
        .map(|o| o.display_name)
        .collect();
    assert_eq!(names, vec!["Vera Holm"]);

    drop(engine);
    remove_db(&db);
}

/// A shortened route retires the dropped step; the remaining steps
/// complete the item and the order.
#[test]
fn shortened_route_retires_dropped_steps() {
    let db = temp_db();
    drop(MesEngine::build(&db, DATA_DIR).unwrap());

    let mut config = PlannerConfig::load(DATA_DIR).unwrap();
    config.routes.get_mut("controller").unwrap().steps.truncate(2);
    let engine = MesEngine::new(config, PlanStore::open(&db).unwrap(), Arc::new(SystemClock)).unwrap();

    let operator_id = engine
        .roster()
        .register(NewOperator {
            display_name: "Ines Marr".into(),
            ..Default::default()
        })
        .unwrap()
        .operator_id;
    let wo = engine
        .work_orders()
        .create(NewWorkOrder {
            order_number: "WO-7001".into(),
            product_type: "controller".into(),
            quantity: 1,
            start_date: "2025-03-10".parse().ok(),
            ship_date: None,
            order_value: 0.0,
        })
        .unwrap();
    let item_id = engine.work_orders().items(&wo.work_order_id).unwrap()[0].item_id.clone();

    assert_eq!(engine.store().steps_for_product("controller").unwrap().len(), 2);
    assert!(matches!(
        engine.store().get_step("ctl.burn_in"),
        Err(PlanError::NotFound { .. })
    ));

    let mut last = StepOutcome::AlreadyCompleted;
    for step in ["ctl.pcb_mount", "ctl.firmware"] {
        engine.steps().start_step(&item_id, step, &operator_id).unwrap();
        last = engine.steps().complete_step(&item_id, step, None).unwrap();
    }
    assert!(matches!(
        last,
        StepOutcome::Completed {
            item_completed: true,
            work_order_completed: true,
            certificate: Some(_),
        }
    ));

    drop(engine);
    remove_db(&db);
}
