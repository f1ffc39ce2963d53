//! Availability store tests.

use chrono::NaiveDate;
use mes_core::{
    availability::AbsenceReason,
    engine::MesEngine,
    error::PlanError,
    operator::NewOperator,
};

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn operator(engine: &MesEngine, name: &str) -> String {
    engine
        .roster()
        .register(NewOperator {
            display_name: name.into(),
            ..Default::default()
        })
        .unwrap()
        .operator_id
}

/// Setting the same (operator, date) twice replaces the entry.
#[test]
fn set_is_an_upsert_per_operator_and_date() {
    let engine = MesEngine::build_test().unwrap();
    let op = operator(&engine, "Mara Lind");
    let book = engine.availability();

    book.set(&op, d("2025-03-10"), 0.0, AbsenceReason::Sick, None).unwrap();
    book.set(&op, d("2025-03-10"), 4.0, AbsenceReason::Training, Some("forklift course".into()))
        .unwrap();

    let entries = book.in_range(d("2025-03-01"), d("2025-03-31")).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].hours, 4.0);
    assert_eq!(entries[0].reason, AbsenceReason::Training);
    assert_eq!(entries[0].note.as_deref(), Some("forklift course"));
    assert!(!entries[0].is_absent());
}

#[test]
fn zero_hours_is_a_full_day_absence() {
    let engine = MesEngine::build_test().unwrap();
    let op = operator(&engine, "Mara Lind");
    engine
        .availability()
        .set(&op, d("2025-03-11"), 0.0, AbsenceReason::Holiday, None)
        .unwrap();

    let entry = engine.availability().on(&op, d("2025-03-11")).unwrap().unwrap();
    assert!(entry.is_absent());
    assert!(engine.availability().on(&op, d("2025-03-12")).unwrap().is_none());
}

#[test]
fn hours_outside_a_day_are_rejected() {
    let engine = MesEngine::build_test().unwrap();
    let op = operator(&engine, "Mara Lind");
    let book = engine.availability();

    for hours in [-1.0, 24.5] {
        let err = book.set(&op, d("2025-03-10"), hours, AbsenceReason::Other, None);
        assert!(matches!(err, Err(PlanError::InvalidHours { .. })), "{hours} accepted");
    }
    assert!(book.on(&op, d("2025-03-10")).unwrap().is_none());
}

#[test]
fn unknown_operator_is_not_found() {
    let engine = MesEngine::build_test().unwrap();
    let book = engine.availability();
    let date = d("2025-03-10");

    let err = book.set("nobody", date, 0.0, AbsenceReason::Sick, None);
    assert!(matches!(err, Err(PlanError::NotFound { .. })));
    assert!(matches!(book.clear("nobody", date), Err(PlanError::NotFound { .. })));
    assert!(matches!(book.on("nobody", date), Err(PlanError::NotFound { .. })));
    assert_eq!(engine.event_count().unwrap(), 0);
}

/// Clearing restores the operator's default capacity in the aggregator.
#[test]
fn clear_falls_back_to_default_capacity() {
    let engine = MesEngine::build_test().unwrap();
    let op = operator(&engine, "Mara Lind");
    let date = d("2025-03-10");
    engine
        .availability()
        .set(&op, date, 0.0, AbsenceReason::Sick, None)
        .unwrap();

    assert!(engine.availability().clear(&op, date).unwrap());
    assert!(!engine.availability().clear(&op, date).unwrap(), "second clear removes nothing");

    let cap = engine.capacity().capacity_for_date(date, None).unwrap();
    assert_eq!(cap.len(), 1);
    assert!(!cap[0].is_unavailable());
    assert_eq!(cap[0].hours_available, engine.config().default_capacity_hours);
}

#[test]
fn inverted_range_is_rejected() {
    let engine = MesEngine::build_test().unwrap();
    let err = engine.availability().in_range(d("2025-03-10"), d("2025-03-01"));
    assert!(matches!(err, Err(PlanError::InvalidRange { .. })));
}
