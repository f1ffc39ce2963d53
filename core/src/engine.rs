//! The planning engine: one store, one config, one clock.
//!
//! RULES:
//!   - Components are built on demand from the accessors below and borrow
//!     the engine; none of them outlive a call or cache rows.
//!   - Every mutation goes through a component, so it is validated,
//!     logged and recorded in the event log.

use crate::{
    availability::AvailabilityBook,
    capacity::CapacityAggregator,
    clock::{Clock, FixedClock, SystemClock},
    command::{CommandOutcome, PlannerCommand},
    config::PlannerConfig,
    editor::AssignmentEditor,
    error::PlanResult,
    event::EventLogEntry,
    execution::StepRunner,
    genealogy::Genealogy,
    operator::Roster,
    planner::Planner,
    presence::PresenceBoard,
    session::Session,
    store::PlanStore,
    work_order::WorkOrderBook,
};
use std::sync::Arc;

pub struct MesEngine {
    config: PlannerConfig,
    store: PlanStore,
    clock: Arc<dyn Clock>,
    presence: PresenceBoard,
}

impl MesEngine {
    /// Migrates the store and mirrors the configured routes into it.
    pub fn new(config: PlannerConfig, store: PlanStore, clock: Arc<dyn Clock>) -> PlanResult<Self> {
        store.migrate()?;
        let steps = store.sync_routes(config.routes.values())?;
        log::debug!("Engine ready: {} routes, {steps} steps", config.routes.len());
        Ok(Self {
            config,
            store,
            clock,
            presence: PresenceBoard::new(),
        })
    }

    /// Open `db` and load configuration from `data_dir`.
    pub fn build(db: &str, data_dir: &str) -> PlanResult<Self> {
        let config = PlannerConfig::load(data_dir)?;
        let store = PlanStore::open(db)?;
        Self::new(config, store, Arc::new(SystemClock))
    }

    /// In-memory engine on the test config and the system clock.
    pub fn build_test() -> PlanResult<Self> {
        Self::new(PlannerConfig::default_test(), PlanStore::in_memory()?, Arc::new(SystemClock))
    }

    /// In-memory engine whose clock the caller controls.
    pub fn build_test_with_clock(clock: Arc<FixedClock>) -> PlanResult<Self> {
        Self::new(PlannerConfig::default_test(), PlanStore::in_memory()?, clock)
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &PlanStore {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn presence(&self) -> &PresenceBoard {
        &self.presence
    }

    pub fn roster(&self) -> Roster<'_> {
        Roster::new(&self.store, &self.config, self.clock())
    }

    pub fn availability(&self) -> AvailabilityBook<'_> {
        AvailabilityBook::new(&self.store, self.clock())
    }

    pub fn capacity(&self) -> CapacityAggregator<'_> {
        CapacityAggregator::new(&self.store, &self.config)
    }

    pub fn editor(&self) -> AssignmentEditor<'_> {
        AssignmentEditor::new(&self.store, &self.config, self.clock())
    }

    pub fn work_orders(&self) -> WorkOrderBook<'_> {
        WorkOrderBook::new(&self.store, &self.config, self.clock())
    }

    pub fn steps(&self) -> StepRunner<'_> {
        StepRunner::new(&self.store, &self.config, self.clock())
    }

    pub fn planner(&self) -> Planner<'_> {
        Planner::new(&self.store, &self.config)
    }

    pub fn genealogy(&self) -> Genealogy<'_> {
        Genealogy::new(&self.store, &self.config, self.clock())
    }

    pub fn sign_in(&self) -> PlanResult<Session<'_>> {
        Session::sign_in(&self.store, &self.config, self.clock())
    }

    pub fn resume_session(&self) -> PlanResult<Option<Session<'_>>> {
        Session::resume(&self.store, &self.config, self.clock())
    }

    /// Audit trail of one operator, work order or item.
    pub fn events_for(&self, entity_id: &str) -> PlanResult<Vec<EventLogEntry>> {
        self.store.events_for_entity(entity_id)
    }

    pub fn event_count(&self) -> PlanResult<i64> {
        self.store.event_count()
    }

    /// Dispatch one client command. Errors are returned as-is; nothing is
    /// retried.
    pub fn apply(&self, command: PlannerCommand) -> PlanResult<CommandOutcome> {
        log::debug!("Applying {command:?}");
        let outcome = match command {
            PlannerCommand::SetAvailability {
                operator_id,
                date,
                hours,
                reason,
                note,
            } => CommandOutcome::AvailabilitySet {
                entry: self.availability().set(&operator_id, date, hours, reason, note)?,
            },
            PlannerCommand::ClearAvailability { operator_id, date } => {
                CommandOutcome::AvailabilityCleared {
                    removed: self.availability().clear(&operator_id, date)?,
                }
            }
            PlannerCommand::AssignWorkOrder {
                work_order_id,
                operator_id,
                date,
            } => CommandOutcome::Assigned {
                summary: self.editor().assign_work_order(&work_order_id, &operator_id, date)?,
            },
            PlannerCommand::AssignProductGroup {
                product_type,
                operator_id,
                date,
            } => CommandOutcome::Assigned {
                summary: self.editor().assign_product_group(&product_type, &operator_id, date)?,
            },
            PlannerCommand::AssignItem {
                item_id,
                operator_id,
                date,
                expected_revision,
            } => CommandOutcome::Assigned {
                summary: self.editor().assign_item(
                    &item_id,
                    operator_id.as_deref(),
                    date,
                    expected_revision,
                )?,
            },
            PlannerCommand::AssignStep {
                item_id,
                step_id,
                operator_id,
                date,
                expected_revision,
            } => CommandOutcome::Assigned {
                summary: self.editor().assign_step(
                    &item_id,
                    &step_id,
                    operator_id.as_deref(),
                    date,
                    expected_revision,
                )?,
            },
            PlannerCommand::StartStep {
                item_id,
                step_id,
                operator_id,
            } => CommandOutcome::Step {
                outcome: self.steps().start_step(&item_id, &step_id, &operator_id)?,
            },
            PlannerCommand::CompleteStep {
                item_id,
                step_id,
                operator_id,
            } => CommandOutcome::Step {
                outcome: self
                    .steps()
                    .complete_step(&item_id, &step_id, operator_id.as_deref())?,
            },
            PlannerCommand::SkipStep {
                item_id,
                step_id,
                reason,
            } => CommandOutcome::Step {
                outcome: self.steps().skip_step(&item_id, &step_id, &reason)?,
            },
            PlannerCommand::ScheduleWorkOrder {
                work_order_id,
                start_date,
                ship_date,
            } => CommandOutcome::Scheduled {
                work_order: self
                    .work_orders()
                    .set_schedule(&work_order_id, start_date, ship_date)?,
            },
        };
        Ok(outcome)
    }
}
