//! Workflow state machine.

use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::workflow;

/// The state of a workflow run.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► RejectedInput
///           ├──► RejectedConflict
///           └──► Failed
/// ```
/// Nothing is persisted between steps; a run reaches a terminal state before
/// its request returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorkflowState {
    /// Steps are being executed.
    #[default]
    Running,

    /// Every step completed (terminal state).
    Completed,

    /// The request was invalid; nothing was committed (terminal state).
    RejectedInput,

    /// The vehicle was already booked; nothing was committed (terminal state).
    RejectedConflict,

    /// A step failed after zero or more steps committed (terminal state).
    Failed,
}

impl WorkflowState {
    /// Classifies the terminal state of a run whose `step` failed with `error`.
    pub fn for_failure(step: &str, error: &SagaError) -> Self {
        match (step, error) {
            (workflow::STEP_VALIDATE_REQUEST, _) => WorkflowState::RejectedInput,
            (workflow::STEP_RESERVE_BOOKING, SagaError::Conflict(_)) => {
                WorkflowState::RejectedConflict
            }
            (workflow::STEP_RESERVE_BOOKING, SagaError::Validation(_)) => {
                WorkflowState::RejectedInput
            }
            _ => WorkflowState::Failed,
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowState::Running)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Running => "Running",
            WorkflowState::Completed => "Completed",
            WorkflowState::RejectedInput => "RejectedInput",
            WorkflowState::RejectedConflict => "RejectedConflict",
            WorkflowState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of workflow a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowKind {
    Reservation,
    Membership,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Reservation => "Reservation",
            WorkflowKind::Membership => "Membership",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
