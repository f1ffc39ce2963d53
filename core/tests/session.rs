//! Session expiry and persisted client state tests.

use chrono::{Duration, TimeZone, Utc};
use mes_core::{
    clock::FixedClock,
    engine::MesEngine,
    error::PlanError,
    session::SessionStatus,
    work_order::NewWorkOrder,
};
use std::sync::Arc;

fn engine_at_eight() -> (MesEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()));
    let engine = MesEngine::build_test_with_clock(clock.clone()).unwrap();
    (engine, clock)
}

/// Expiry counts from sign-in with no regard to activity.
#[test]
fn session_expires_twelve_hours_after_sign_in() {
    let (engine, clock) = engine_at_eight();
    let session = engine.sign_in().unwrap();

    clock.advance(Duration::hours(6));
    session.visit("/planner").unwrap();

    clock.advance(Duration::hours(5) + Duration::minutes(59));
    assert!(matches!(session.status(), SessionStatus::Active { .. }));

    clock.advance(Duration::minutes(1));
    assert_eq!(
        session.status(),
        SessionStatus::Expired {
            redirect: "/login".into()
        }
    );
    assert!(matches!(
        session.ensure_active(),
        Err(PlanError::SessionExpired { redirect }) if redirect == "/login"
    ));
    assert!(session.visit("/work-orders").is_err());
}

/// A reload resumes the persisted session and keeps its original expiry.
#[test]
fn resumed_session_keeps_its_start() {
    let (engine, clock) = engine_at_eight();
    let started = engine.sign_in().unwrap().started_at();

    clock.advance(Duration::hours(13));
    let resumed = engine.resume_session().unwrap().expect("persisted session");
    assert_eq!(resumed.started_at(), started);
    assert!(matches!(resumed.status(), SessionStatus::Expired { .. }));

    resumed.end().unwrap();
    assert!(engine.resume_session().unwrap().is_none());
}

/// The restore route is consumed by its first read.
#[test]
fn restore_route_is_one_shot() {
    let (engine, _clock) = engine_at_eight();
    let mut session = engine.sign_in().unwrap();

    session.remember_route("/work-orders/WO-1001").unwrap();
    assert_eq!(session.take_restore_route().unwrap().as_deref(), Some("/work-orders/WO-1001"));
    assert_eq!(session.take_restore_route().unwrap(), None);

    let mut reloaded = engine.resume_session().unwrap().unwrap();
    assert_eq!(reloaded.take_restore_route().unwrap(), None);
}

/// A reload brings back the scoped state; a fresh sign-in does not.
#[test]
fn scoped_state_survives_reload_but_not_sign_in() {
    let (engine, clock) = engine_at_eight();
    {
        let mut session = engine.sign_in().unwrap();
        session.set_view_state("work_orders.view_mode", "grouped").unwrap();
        session.set_view_state("work_orders.filter.status", "in_progress").unwrap();
        session.remember_route("/work-orders/WO-1").unwrap();
    }

    clock.advance(Duration::minutes(10));
    let mut reloaded = engine.resume_session().unwrap().expect("persisted session");
    assert_eq!(reloaded.view_state("work_orders.view_mode"), Some("grouped"));
    assert_eq!(reloaded.view_state("work_orders.filter.status"), Some("in_progress"));
    assert_eq!(reloaded.take_restore_route().unwrap().as_deref(), Some("/work-orders/WO-1"));
    drop(reloaded);

    clock.advance(Duration::minutes(10));
    let fresh = engine.sign_in().unwrap();
    assert_eq!(fresh.view_state("work_orders.view_mode"), None);
    drop(fresh);
    let mut again = engine.resume_session().unwrap().unwrap();
    assert_eq!(again.view_state("work_orders.view_mode"), None);
    assert_eq!(again.take_restore_route().unwrap(), None);
}

/// A restore route handed over at sign-out reaches the next session.
#[test]
fn restore_route_carries_into_next_session() {
    let (engine, clock) = engine_at_eight();
    let mut session = engine.sign_in().unwrap();
    session.remember_route("/planner?date=2025-03-10").unwrap();
    let pending = session.end().unwrap();

    clock.advance(Duration::hours(1));
    let next = engine.sign_in().unwrap().with_restore_route(pending).unwrap();
    drop(next);
    let mut resumed = engine.resume_session().unwrap().unwrap();
    assert_eq!(
        resumed.take_restore_route().unwrap().as_deref(),
        Some("/planner?date=2025-03-10")
    );
}

/// Session-scoped view state dies with the session; the last route and
/// recent searches do not.
#[test]
fn persisted_state_survives_a_new_session() {
    let (engine, clock) = engine_at_eight();
    engine
        .work_orders()
        .create(NewWorkOrder {
            order_number: "WO-6001".into(),
            product_type: "controller".into(),
            quantity: 1,
            start_date: None,
            ship_date: None,
            order_value: 0.0,
        })
        .unwrap();

    let mut session = engine.sign_in().unwrap();
    session.set_view_state("planner.granularity", "week").unwrap();
    session.visit("/planner").unwrap();
    engine.genealogy().search("WO-6001").unwrap();
    engine.genealogy().search("controller").unwrap();
    assert_eq!(session.view_state("planner.granularity"), Some("week"));
    session.end().unwrap();

    clock.advance(Duration::days(2));
    let next = engine.sign_in().unwrap();
    assert_eq!(next.view_state("planner.granularity"), None);
    assert_eq!(next.last_route().unwrap().as_deref(), Some("/planner"));
    assert_eq!(next.recent_searches().unwrap(), vec!["controller", "WO-6001"]);
}

#[test]
fn recent_searches_are_deduplicated_and_capped() {
    let (engine, _clock) = engine_at_eight();
    let limit = engine.config().recent_search_limit;
    let genealogy = engine.genealogy();

    for n in 0..limit + 3 {
        genealogy.search(&format!("WO-{n}")).unwrap();
    }
    genealogy.search("WO-5").unwrap();
    genealogy.search("   ").unwrap();

    let session = engine.sign_in().unwrap();
    let recent = session.recent_searches().unwrap();
    assert_eq!(recent.len(), limit);
    assert_eq!(recent[0], "WO-5");
    assert_eq!(recent.iter().filter(|t| *t == "WO-5").count(), 1);
    assert_eq!(recent[1], format!("WO-{}", limit + 2));

    session.clear_recent_searches().unwrap();
    assert!(session.recent_searches().unwrap().is_empty());
}
