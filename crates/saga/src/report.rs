//! Outcome of a single workflow run.

use common::WorkflowId;
use storage::{BookingId, PaymentId};

use crate::error::SagaError;
use crate::state::{WorkflowKind, WorkflowState};

/// What a workflow run committed and where it stopped.
///
/// Steps commit independently, so a failed run may still carry a booking
/// and a payment. Callers use these IDs to retry notification or reconcile.
#[derive(Debug)]
pub struct WorkflowReport {
    pub workflow_id: WorkflowId,
    pub kind: WorkflowKind,
    pub state: WorkflowState,
    /// Completed steps, in execution order.
    pub completed_steps: Vec<&'static str>,
    pub booking_id: Option<BookingId>,
    pub payment_id: Option<PaymentId>,
    pub membership_level: Option<String>,
    pub failed_step: Option<&'static str>,
    pub error: Option<SagaError>,
}

impl WorkflowReport {
    pub(crate) fn start(kind: WorkflowKind) -> Self {
        Self {
            workflow_id: WorkflowId::new(),
            kind,
            state: WorkflowState::Running,
            completed_steps: Vec::new(),
            booking_id: None,
            payment_id: None,
            membership_level: None,
            failed_step: None,
            error: None,
        }
    }

    pub(crate) fn step_completed(&mut self, step: &'static str) {
        self.completed_steps.push(step);
    }

    pub(crate) fn fail(mut self, step: &'static str, error: SagaError) -> Self {
        self.state = WorkflowState::for_failure(step, &error);
        self.failed_step = Some(step);
        self.error = Some(error);
        self
    }

    pub(crate) fn complete(mut self) -> Self {
        self.state = WorkflowState::Completed;
        self
    }

    /// Returns true if every step completed.
    pub fn is_completed(&self) -> bool {
        self.state == WorkflowState::Completed
    }

    /// Returns true if the step completed during this run.
    pub fn has_completed(&self, step: &str) -> bool {
        self.completed_steps.iter().any(|completed| *completed == step)
    }
}
