//! Saga error types.

use domain::DomainError;
use storage::StorageError;
use thiserror::Error;

use crate::services::outbound::DependencyError;

/// Errors that can end a workflow step.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request is malformed or was rejected as invalid by a collaborator.
    #[error("{0}")]
    Validation(String),

    /// The vehicle is already booked for the requested interval.
    #[error("{0}")]
    Conflict(String),

    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The shared store failed.
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// A remote service failed or returned an unexpected response.
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// The invoice could not be dispatched.
    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<DomainError> for SagaError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(message) => SagaError::Validation(message),
            DomainError::Conflict(message) => SagaError::Conflict(message),
            DomainError::NotFound(message) => SagaError::NotFound(message),
            DomainError::Storage(e) => SagaError::Storage(e),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
