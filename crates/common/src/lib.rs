//! Shared types for the rental services.

pub mod money;
pub mod types;

pub use money::{Money, ParseMoneyError};
pub use types::{BookingId, ParseIdError, PaymentId, UserId, VehicleId, WorkflowId};
