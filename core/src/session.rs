//! Sign-in session and client state.
//!
//! The session start instant is persisted, so a reload resumes the same
//! session. Expiry counts from that instant regardless of activity.
//!
//! Two scopes of state:
//! - session-scoped (stored under `session.<started_at>.`, loaded on
//!   resume, dropped by `end` and by the next `sign_in`): the one-shot
//!   route to restore after a redirect, filter values, view modes.
//! - persisted (survives sessions): last visited route and recent
//!   searches.

use crate::{
    clock::Clock,
    config::PlannerConfig,
    error::{PlanError, PlanResult},
    store::PlanStore,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SESSION_PREFIX: &str = "session.";
const SESSION_STARTED_KEY: &str = "session.started_at";
const LAST_ROUTE_KEY: &str = "navigation.last_route";
const RESTORE_ROUTE: &str = "restore_route";
const VIEW_PREFIX: &str = "view.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Active { expires_at: DateTime<Utc> },
    Expired { redirect: String },
}

pub struct Session<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
    started_at: DateTime<Utc>,
    /// Key prefix of this session's scoped state.
    scope: String,
    restore_route: Option<String>,
    view_state: HashMap<String, String>,
}

impl<'a> Session<'a> {
    /// Sign in: a fresh session starting now. Scoped state left by any
    /// earlier session is dropped.
    pub fn sign_in(store: &'a PlanStore, config: &'a PlannerConfig, clock: &'a dyn Clock) -> PlanResult<Self> {
        let started_at = clock.now();
        let dropped = store.delete_preferences_with_prefix(SESSION_PREFIX)?;
        if dropped > 0 {
            log::debug!("Dropped {dropped} keys of the previous session");
        }
        store.set_preference(SESSION_STARTED_KEY, &started_at.to_rfc3339(), started_at)?;
        log::info!("Session started at {started_at}");
        Ok(Self::with_start(store, config, clock, started_at))
    }

    /// The persisted session with its scoped state, if one was started and
    /// not ended. It may already be expired; check `status()`.
    pub fn resume(
        store: &'a PlanStore,
        config: &'a PlannerConfig,
        clock: &'a dyn Clock,
    ) -> PlanResult<Option<Self>> {
        let Some(raw) = store.preference(SESSION_STARTED_KEY)? else {
            return Ok(None);
        };
        let started_at = DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc);
        let mut session = Self::with_start(store, config, clock, started_at);
        for (key, value) in store.preferences_with_prefix(&session.scope)? {
            let name = &key[session.scope.len()..];
            if name == RESTORE_ROUTE {
                session.restore_route = Some(value);
            } else if let Some(view_key) = name.strip_prefix(VIEW_PREFIX) {
                session.view_state.insert(view_key.to_string(), value);
            }
        }
        Ok(Some(session))
    }

    fn with_start(
        store: &'a PlanStore,
        config: &'a PlannerConfig,
        clock: &'a dyn Clock,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            config,
            clock,
            started_at,
            scope: format!("{SESSION_PREFIX}{}.", started_at.to_rfc3339()),
            restore_route: None,
            view_state: HashMap::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + Duration::hours(self.config.session_timeout_hours)
    }

    pub fn status(&self) -> SessionStatus {
        if self.clock.now() >= self.expires_at() {
            SessionStatus::Expired {
                redirect: self.config.login_route.clone(),
            }
        } else {
            SessionStatus::Active {
                expires_at: self.expires_at(),
            }
        }
    }

    pub fn ensure_active(&self) -> PlanResult<()> {
        match self.status() {
            SessionStatus::Active { .. } => Ok(()),
            SessionStatus::Expired { redirect } => {
                log::warn!("Session from {} expired", self.started_at);
                Err(PlanError::SessionExpired { redirect })
            }
        }
    }

    /// Sign out and drop the scoped state. Returns the pending restore
    /// route, if any, so the next session can pick it up with
    /// `with_restore_route`.
    pub fn end(self) -> PlanResult<Option<String>> {
        self.store.delete_preferences_with_prefix(SESSION_PREFIX)?;
        log::info!("Session from {} ended", self.started_at);
        Ok(self.restore_route)
    }

    // ── Session-scoped ────────────────────────────────────────

    fn scoped_key(&self, name: &str) -> String {
        format!("{}{name}", self.scope)
    }

    pub fn with_restore_route(mut self, route: Option<String>) -> PlanResult<Self> {
        match &route {
            Some(r) => self.remember_route(r)?,
            None => {
                self.store.delete_preference(&self.scoped_key(RESTORE_ROUTE))?;
                self.restore_route = None;
            }
        }
        Ok(self)
    }

    pub fn remember_route(&mut self, route: &str) -> PlanResult<()> {
        self.store
            .set_preference(&self.scoped_key(RESTORE_ROUTE), route, self.clock.now())?;
        self.restore_route = Some(route.to_string());
        Ok(())
    }

    /// One-shot: the second call returns None, also after a reload.
    pub fn take_restore_route(&mut self) -> PlanResult<Option<String>> {
        let route = self.restore_route.take();
        if route.is_some() {
            self.store.delete_preference(&self.scoped_key(RESTORE_ROUTE))?;
        }
        Ok(route)
    }

    pub fn set_view_state(&mut self, key: &str, value: &str) -> PlanResult<()> {
        let stored = self.scoped_key(&format!("{VIEW_PREFIX}{key}"));
        self.store.set_preference(&stored, value, self.clock.now())?;
        self.view_state.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn view_state(&self, key: &str) -> Option<&str> {
        self.view_state.get(key).map(String::as_str)
    }

    // ── Persisted ─────────────────────────────────────────────

    pub fn visit(&self, route: &str) -> PlanResult<()> {
        self.ensure_active()?;
        self.store
            .set_preference(LAST_ROUTE_KEY, route, self.clock.now())
    }

    pub fn last_route(&self) -> PlanResult<Option<String>> {
        self.store.preference(LAST_ROUTE_KEY)
    }

    pub fn recent_searches(&self) -> PlanResult<Vec<String>> {
        self.store.recent_searches()
    }

    pub fn clear_recent_searches(&self) -> PlanResult<()> {
        self.store.clear_recent_searches()
    }
}
