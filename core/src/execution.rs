//! Production step execution.
//!
//! Per (item, step): `pending -> in_progress -> {completed | skipped}`.
//! There are no reverse transitions. Only the item's current step may be
//! started. Finishing a step advances the item; finishing the last step
//! completes the item, issues its certificate, and completes the work
//! order once every item is done.

use crate::{
    clock::Clock,
    config::PlannerConfig,
    error::{PlanError, PlanResult},
    event::PlanEvent,
    store::PlanStore,
    types::{text_enum, ItemId, OperatorId, StepId, WorkOrderId},
    work_order::{change_status, ItemStatus, WorkOrder, WorkOrderItem, WorkOrderStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionStep {
    pub step_id: StepId,
    pub product_type: String,
    pub position: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

text_enum!(StepStatus, "step status" {
    Pending    => "pending",
    InProgress => "in_progress",
    Completed  => "completed",
    Skipped    => "skipped",
});

impl StepStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepExecution {
    pub execution_id: String,
    pub item_id: ItemId,
    pub step_id: StepId,
    pub status: StepStatus,
    pub operator_id: Option<OperatorId>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub certificate_id: String,
    pub item_id: ItemId,
    pub work_order_id: WorkOrderId,
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Started,
    Completed {
        item_completed: bool,
        work_order_completed: bool,
        certificate: Option<Certificate>,
    },
    Skipped {
        item_completed: bool,
        work_order_completed: bool,
    },
    /// A retried completion of a step that is already completed.
    AlreadyCompleted,
}

pub struct StepRunner<'a> {
    store: &'a PlanStore,
    config: &'a PlannerConfig,
    clock: &'a dyn Clock,
}

struct StepContext {
    item: WorkOrderItem,
    work_order: WorkOrder,
    step: ProductionStep,
    route_len: u32,
    execution: Option<StepExecution>,
}

struct Advance {
    item_completed: bool,
    work_order_completed: bool,
    certificate: Option<Certificate>,
}

impl<'a> StepRunner<'a> {
    pub fn new(store: &'a PlanStore, config: &'a PlannerConfig, clock: &'a dyn Clock) -> Self {
        Self { store, config, clock }
    }

    pub fn start_step(&self, item_id: &str, step_id: &str, operator_id: &str) -> PlanResult<StepOutcome> {
        let txn = self.store.begin_immediate()?;
        let ctx = self.load(item_id, step_id)?;
        self.store.get_operator(operator_id)?;

        if let Some(exec) = &ctx.execution {
            if exec.status != StepStatus::Pending {
                return Err(transition_error(&ctx, exec.status, StepStatus::InProgress));
            }
        }
        require_current(&ctx)?;

        let now = self.clock.now();
        let exec = StepExecution {
            execution_id: ctx
                .execution
                .as_ref()
                .map(|e| e.execution_id.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            item_id: item_id.to_string(),
            step_id: step_id.to_string(),
            status: StepStatus::InProgress,
            operator_id: Some(operator_id.to_string()),
            started_at: Some(now),
            finished_at: None,
            notes: None,
        };
        self.store.upsert_execution(&exec)?;

        if ctx.item.status == ItemStatus::Pending {
            self.store.update_item_progress(item_id, ItemStatus::InProgress, ctx.item.current_step)?;
        }
        if ctx.work_order.status == WorkOrderStatus::Planned {
            change_status(self.store, &ctx.work_order, WorkOrderStatus::InProgress, now)?;
        }
        self.store.append_event(
            &PlanEvent::StepStarted {
                item_id: item_id.to_string(),
                step_id: step_id.to_string(),
                operator_id: operator_id.to_string(),
            },
            now,
        )?;
        txn.commit()?;

        log::info!("Step {step_id} started on {} by {operator_id}", ctx.item.serial_number);
        Ok(StepOutcome::Started)
    }

    /// Completing a step twice is not an error: the second call reports
    /// `AlreadyCompleted` and writes nothing.
    pub fn complete_step(
        &self,
        item_id: &str,
        step_id: &str,
        operator_id: Option<&str>,
    ) -> PlanResult<StepOutcome> {
        let txn = self.store.begin_immediate()?;
        let ctx = self.load(item_id, step_id)?;

        let mut exec = match &ctx.execution {
            Some(e) if e.status == StepStatus::Completed => {
                log::debug!("Step {step_id} on {item_id} already completed");
                return Ok(StepOutcome::AlreadyCompleted);
            }
            Some(e) if e.status == StepStatus::InProgress => e.clone(),
            Some(e) => return Err(transition_error(&ctx, e.status, StepStatus::Completed)),
            None => return Err(transition_error(&ctx, StepStatus::Pending, StepStatus::Completed)),
        };
        if let Some(op) = operator_id {
            self.store.get_operator(op)?;
            exec.operator_id = Some(op.to_string());
        }

        let now = self.clock.now();
        exec.status = StepStatus::Completed;
        exec.finished_at = Some(now);
        self.store.upsert_execution(&exec)?;
        self.store.append_event(
            &PlanEvent::StepCompleted {
                item_id: item_id.to_string(),
                step_id: step_id.to_string(),
                operator_id: exec.operator_id.clone(),
            },
            now,
        )?;
        let advance = self.advance(&ctx, now)?;
        txn.commit()?;

        log::info!("Step {step_id} completed on {}", ctx.item.serial_number);
        Ok(StepOutcome::Completed {
            item_completed: advance.item_completed,
            work_order_completed: advance.work_order_completed,
            certificate: advance.certificate,
        })
    }

    pub fn skip_step(&self, item_id: &str, step_id: &str, reason: &str) -> PlanResult<StepOutcome> {
        let txn = self.store.begin_immediate()?;
        let ctx = self.load(item_id, step_id)?;

        let mut exec = match &ctx.execution {
            Some(e) if e.status == StepStatus::InProgress => e.clone(),
            Some(e) => return Err(transition_error(&ctx, e.status, StepStatus::Skipped)),
            None => return Err(transition_error(&ctx, StepStatus::Pending, StepStatus::Skipped)),
        };

        let now = self.clock.now();
        exec.status = StepStatus::Skipped;
        exec.finished_at = Some(now);
        exec.notes = Some(reason.to_string());
        self.store.upsert_execution(&exec)?;
        self.store.append_event(
            &PlanEvent::StepSkipped {
                item_id: item_id.to_string(),
                step_id: step_id.to_string(),
                reason: reason.to_string(),
            },
            now,
        )?;
        let advance = self.advance(&ctx, now)?;
        txn.commit()?;

        log::info!("Step {step_id} skipped on {}: {reason}", ctx.item.serial_number);
        Ok(StepOutcome::Skipped {
            item_completed: advance.item_completed,
            work_order_completed: advance.work_order_completed,
        })
    }

    /// Executions for an item in route order; steps never touched are absent.
    pub fn executions(&self, item_id: &str) -> PlanResult<Vec<StepExecution>> {
        self.store.get_item(item_id)?;
        self.store.executions_for_item(item_id)
    }

    pub fn certificate(&self, item_id: &str) -> PlanResult<Option<Certificate>> {
        self.store.certificate_for_item(item_id)
    }

    fn load(&self, item_id: &str, step_id: &str) -> PlanResult<StepContext> {
        let item = self.store.get_item(item_id)?;
        let work_order = self.store.get_work_order(&item.work_order_id)?;
        let step = self.store.get_step(step_id)?;
        if step.product_type != work_order.product_type {
            return Err(PlanError::not_found(
                "step on route",
                format!("{}/{step_id}", work_order.product_type),
            ));
        }
        let route_len = self.store.steps_for_product(&work_order.product_type)?.len() as u32;
        let execution = self.store.get_execution(item_id, step_id)?;
        Ok(StepContext {
            item,
            work_order,
            step,
            route_len,
            execution,
        })
    }

    fn advance(&self, ctx: &StepContext, now: DateTime<Utc>) -> PlanResult<Advance> {
        let next = ctx.step.position + 1;
        let item_completed = next >= ctx.route_len;
        let status = if item_completed {
            ItemStatus::Completed
        } else {
            ItemStatus::InProgress
        };
        self.store.update_item_progress(&ctx.item.item_id, status, next)?;

        let mut advance = Advance {
            item_completed,
            work_order_completed: false,
            certificate: None,
        };
        if !item_completed {
            return Ok(advance);
        }

        self.store.append_event(
            &PlanEvent::ItemCompleted {
                item_id: ctx.item.item_id.clone(),
                work_order_id: ctx.work_order.work_order_id.clone(),
            },
            now,
        )?;
        if self.config.auto_certificate {
            advance.certificate = Some(self.issue_certificate(ctx, now)?);
        }

        let open = self
            .store
            .items_for_work_order(&ctx.work_order.work_order_id)?
            .iter()
            .filter(|i| i.status != ItemStatus::Completed)
            .count();
        if open == 0 {
            change_status(self.store, &ctx.work_order, WorkOrderStatus::Completed, now)?;
            advance.work_order_completed = true;
        }
        Ok(advance)
    }

    fn issue_certificate(&self, ctx: &StepContext, now: DateTime<Utc>) -> PlanResult<Certificate> {
        if let Some(existing) = self.store.certificate_for_item(&ctx.item.item_id)? {
            return Ok(existing);
        }
        let cert = Certificate {
            certificate_id: uuid::Uuid::new_v4().to_string(),
            item_id: ctx.item.item_id.clone(),
            work_order_id: ctx.work_order.work_order_id.clone(),
            certificate_number: format!("{}-{}", self.config.certificate_prefix, ctx.item.serial_number),
            issued_at: now,
        };
        self.store.insert_certificate(&cert)?;
        self.store.append_event(
            &PlanEvent::CertificateIssued {
                certificate_id: cert.certificate_id.clone(),
                item_id: cert.item_id.clone(),
                certificate_number: cert.certificate_number.clone(),
            },
            now,
        )?;
        Ok(cert)
    }
}

fn require_current(ctx: &StepContext) -> PlanResult<()> {
    if ctx.step.position != ctx.item.current_step {
        return Err(PlanError::StepOutOfOrder {
            item_id: ctx.item.item_id.clone(),
            step_id: ctx.step.step_id.clone(),
            current: ctx.item.current_step,
        });
    }
    Ok(())
}

fn transition_error(ctx: &StepContext, from: StepStatus, to: StepStatus) -> PlanError {
    log::warn!(
        "Rejected step transition {from} -> {to} for {} on {}",
        ctx.step.step_id,
        ctx.item.serial_number
    );
    PlanError::InvalidTransition {
        item_id: ctx.item.item_id.clone(),
        step_id: ctx.step.step_id.clone(),
        from: from.to_string(),
        to: to.to_string(),
    }
}
