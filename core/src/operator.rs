//! Operators and role management.
//!
//! Operators are never deleted. Revoking the `operator` role takes someone
//! out of every capacity and planner view while keeping their history.

use crate::{
    clock::Clock,
    config::PlannerConfig,
    error::{PlanError, PlanResult},
    event::PlanEvent,
    store::PlanStore,
    types::{text_enum, OperatorId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operator {
    pub operator_id: OperatorId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub daily_capacity_hours: f64,
    /// Profile-level switch. False blocks assignment on every date.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Operator,
    Planner,
    Quality,
    Admin,
}

text_enum!(Role, "role" {
    Operator => "operator",
    Planner  => "planner",
    Quality  => "quality",
    Admin    => "admin",
});

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOperator {
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub daily_capacity_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<Option<String>>,
    #[serde(default)]
    pub daily_capacity_hours: Option<f64>,
}

pub struct Roster<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
}

impl<'a> Roster<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    /// Signup: creates the operator and grants the `operator` role.
    pub fn register(&self, new: NewOperator) -> PlanResult<Operator> {
        let hours = new
            .daily_capacity_hours
            .unwrap_or(self.config.default_capacity_hours);
        check_hours(hours)?;

        let now = self.clock.now();
        let operator = Operator {
            operator_id: uuid::Uuid::new_v4().to_string(),
            display_name: new.display_name,
            avatar_url: new.avatar_url,
            daily_capacity_hours: hours,
            is_available: true,
            created_at: now,
        };

        let txn = self.store.begin_immediate()?;
        self.store.insert_operator(&operator)?;
        self.store.grant_role(&operator.operator_id, Role::Operator, now)?;
        self.store.append_event(
            &PlanEvent::OperatorRegistered {
                operator_id: operator.operator_id.clone(),
                display_name: operator.display_name.clone(),
            },
            now,
        )?;
        txn.commit()?;

        log::info!("Registered operator {} ({})", operator.display_name, operator.operator_id);
        Ok(operator)
    }

    pub fn get(&self, operator_id: &str) -> PlanResult<Operator> {
        self.store.get_operator(operator_id)
    }

    pub fn all(&self) -> PlanResult<Vec<Operator>> {
        self.store.list_operators()
    }

    pub fn update_profile(&self, operator_id: &str, update: ProfileUpdate) -> PlanResult<Operator> {
        let mut operator = self.store.get_operator(operator_id)?;
        if let Some(name) = update.display_name {
            operator.display_name = name;
        }
        if let Some(avatar) = update.avatar_url {
            operator.avatar_url = avatar;
        }
        if let Some(hours) = update.daily_capacity_hours {
            check_hours(hours)?;
            operator.daily_capacity_hours = hours;
        }
        self.store.update_operator(&operator)?;
        self.store.append_event(
            &PlanEvent::OperatorProfileUpdated {
                operator_id: operator.operator_id.clone(),
                display_name: operator.display_name.clone(),
                daily_capacity_hours: operator.daily_capacity_hours,
            },
            self.clock.now(),
        )?;
        log::info!("Updated profile of {} ({})", operator.display_name, operator.operator_id);
        Ok(operator)
    }

    pub fn set_available(&self, operator_id: &str, is_available: bool) -> PlanResult<()> {
        self.store.get_operator(operator_id)?;
        self.store.set_operator_available(operator_id, is_available)?;
        self.store.append_event(
            &PlanEvent::OperatorAvailabilityFlagged {
                operator_id: operator_id.to_string(),
                is_available,
            },
            self.clock.now(),
        )?;
        log::info!("Operator {operator_id} flagged is_available={is_available}");
        Ok(())
    }

    pub fn grant_role(&self, operator_id: &str, role: Role) -> PlanResult<bool> {
        self.store.get_operator(operator_id)?;
        let now = self.clock.now();
        let granted = self.store.grant_role(operator_id, role, now)?;
        if granted {
            self.store.append_event(
                &PlanEvent::RoleGranted {
                    operator_id: operator_id.to_string(),
                    role,
                },
                now,
            )?;
        }
        Ok(granted)
    }

    pub fn revoke_role(&self, operator_id: &str, role: Role) -> PlanResult<bool> {
        self.store.get_operator(operator_id)?;
        let revoked = self.store.revoke_role(operator_id, role)?;
        if revoked {
            self.store.append_event(
                &PlanEvent::RoleRevoked {
                    operator_id: operator_id.to_string(),
                    role,
                },
                self.clock.now(),
            )?;
            log::info!("Revoked role {role} from {operator_id}");
        }
        Ok(revoked)
    }

    pub fn roles_of(&self, operator_id: &str) -> PlanResult<Vec<Role>> {
        self.store.roles_of(operator_id)
    }

    /// Operators holding the `operator` role, by display name.
    pub fn schedulable(&self) -> PlanResult<Vec<Operator>> {
        self.store.schedulable_operators()
    }
}

pub(crate) fn check_hours(hours: f64) -> PlanResult<()> {
    if (0.0..=24.0).contains(&hours) {
        Ok(())
    } else {
        Err(PlanError::InvalidHours { hours })
    }
}
