//! Domain error types.

use storage::StorageError;
use thiserror::Error;

/// Errors that can occur during booking and payment operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request is malformed or violates a business rule.
    #[error("{0}")]
    Validation(String),

    /// The requested interval overlaps an existing booking.
    #[error("{0}")]
    Conflict(String),

    /// The referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store failed to complete the operation.
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        DomainError::NotFound(message.into())
    }
}

impl From<StorageError> for DomainError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Overlap { vehicle_id, .. } => {
                metrics::counter!("booking_conflicts_total").increment(1);
                DomainError::Conflict(format!(
                    "Vehicle {vehicle_id} is not available for the selected dates"
                ))
            }
            StorageError::UnknownVehicle(vehicle_id) => {
                DomainError::Validation(format!("Unknown vehicle: {vehicle_id}"))
            }
            other => DomainError::Storage(other),
        }
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
