//! Role management tests.

use mes_core::{
    engine::MesEngine,
    error::PlanError,
    operator::{NewOperator, ProfileUpdate, Role},
};

fn register(engine: &MesEngine, name: &str) -> String {
    engine
        .roster()
        .register(NewOperator {
            display_name: name.into(),
            ..Default::default()
        })
        .unwrap()
        .operator_id
}

/// Signup grants the operator role and the default capacity.
#[test]
fn registration_grants_operator_role() {
    let engine = MesEngine::build_test().unwrap();
    let id = register(&engine, "Rui Santos");

    assert_eq!(engine.roster().roles_of(&id).unwrap(), vec![Role::Operator]);
    let op = engine.roster().get(&id).unwrap();
    assert_eq!(op.daily_capacity_hours, engine.config().default_capacity_hours);
    assert!(op.is_available);
}

#[test]
fn grant_and_revoke_report_changes() {
    let engine = MesEngine::build_test().unwrap();
    let id = register(&engine, "Rui Santos");
    let roster = engine.roster();

    assert!(roster.grant_role(&id, Role::Quality).unwrap());
    assert!(!roster.grant_role(&id, Role::Quality).unwrap());
    assert_eq!(roster.roles_of(&id).unwrap(), vec![Role::Operator, Role::Quality]);

    assert!(roster.revoke_role(&id, Role::Quality).unwrap());
    assert!(!roster.revoke_role(&id, Role::Quality).unwrap());
    assert!(matches!(
        roster.grant_role("ghost", Role::Admin),
        Err(PlanError::NotFound { .. })
    ));
}

/// Revoking the operator role is the soft delete: the person stays on
/// record but is no longer schedulable.
#[test]
fn revoked_operator_stays_on_record() {
    let engine = MesEngine::build_test().unwrap();
    let keep = register(&engine, "Rui Santos");
    let gone = register(&engine, "Alma Quist");
    engine.roster().revoke_role(&gone, Role::Operator).unwrap();

    let schedulable: Vec<String> = engine
        .roster()
        .schedulable()
        .unwrap()
        .into_iter()
        .map(|o| o.operator_id)
        .collect();
    assert_eq!(schedulable, vec![keep]);
    assert_eq!(engine.roster().all().unwrap().len(), 2);

    let events = engine.events_for(&gone).unwrap();
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["operator_registered", "role_revoked"]);
}

#[test]
fn profile_update_validates_hours() {
    let engine = MesEngine::build_test().unwrap();
    let id = register(&engine, "Rui Santos");

    let updated = engine
        .roster()
        .update_profile(
            &id,
            ProfileUpdate {
                display_name: Some("Rui M. Santos".into()),
                daily_capacity_hours: Some(6.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.display_name, "Rui M. Santos");
    assert_eq!(updated.daily_capacity_hours, 6.0);
    let last = engine.events_for(&id).unwrap().pop().unwrap();
    assert_eq!(last.event_type, "operator_profile_updated");

    let err = engine.roster().update_profile(
        &id,
        ProfileUpdate {
            daily_capacity_hours: Some(30.0),
            ..Default::default()
        },
    );
    assert!(matches!(err, Err(PlanError::InvalidHours { .. })));
}
