//! Row models shared by the store implementations.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookingId, Money, PaymentId, UserId, VehicleId};

/// A fleet vehicle. Read-only from the point of view of these services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub model: String,
    pub location: String,
    /// Battery charge in percent; absent for vehicles without telemetry.
    pub charge_level: Option<i32>,
    pub cleanliness_status: String,
    pub hourly_rate: Money,
}

/// A booking to be inserted. The store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_price: Money,
}

/// A stored booking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_price: Money,
}

/// A booking joined with the attributes of its vehicle.
///
/// Produced at read time; the vehicle attributes are never stored on the
/// booking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub model: String,
    pub location: String,
    pub charge_level: Option<i32>,
    pub hourly_rate: Money,
}

/// The interval of a booking, used for conflict inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSlot {
    pub booking_id: BookingId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// New values for a booking modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingChanges {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_price: Money,
}

/// Payment status. Only completed payments are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Completed,
}

impl PaymentStatus {
    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "Completed",
        }
    }

    /// Parses a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Completed" => Some(PaymentStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership level purchased by a payment, with its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTerm {
    pub level: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A payment to be inserted. The store assigns the identifier and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: UserId,
    /// Absent for membership purchases.
    pub booking_id: Option<BookingId>,
    pub amount: Money,
    pub method: String,
    pub status: PaymentStatus,
    pub discount: Money,
    pub final_amount: Money,
    pub membership: Option<MembershipTerm>,
}

/// A stored payment row. Payments are never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub booking_id: Option<BookingId>,
    pub amount: Money,
    pub method: String,
    pub status: PaymentStatus,
    pub discount: Money,
    pub final_amount: Money,
    pub membership: Option<MembershipTerm>,
    pub created_at: DateTime<Utc>,
}
