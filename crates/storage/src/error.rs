use std::time::Duration;

use thiserror::Error;

use crate::{BookingId, VehicleId};

/// Errors that can occur when interacting with the rental store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would overlap an existing booking for the same vehicle.
    #[error("Booking interval overlaps an existing booking for vehicle {vehicle_id}")]
    Overlap {
        vehicle_id: VehicleId,
        /// The booking being modified, if the write was an update.
        booking_id: Option<BookingId>,
    },

    /// The referenced vehicle does not exist in the catalog.
    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(VehicleId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The statement did not complete within the configured bound.
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store refused the operation (injected by the in-memory store).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
