//! Workflow request bodies and their validation.
//!
//! Bodies arrive from browser clients that send identifiers and amounts
//! either as JSON numbers or as strings, so those fields accept both.

use chrono::NaiveDate;
use domain::{RentalInterval, parse_date, parse_timestamp};
use serde::Deserialize;
use storage::{MembershipTerm, Money, UserId, VehicleId};

use crate::error::{Result, SagaError};

/// A JSON scalar that may carry a number either natively or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    fn as_id<T>(&self, field: &str, positive: impl Fn(i64) -> Option<T>) -> Result<T> {
        let value = match self {
            FieldValue::Int(value) => Some(*value),
            FieldValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            FieldValue::Float(_) => None,
            FieldValue::Text(text) => text.trim().parse().ok(),
        };
        value
            .and_then(positive)
            .ok_or_else(|| invalid(format!("Invalid {field}")))
    }

    fn as_money(&self, field: &str) -> Result<Money> {
        let money = match self {
            FieldValue::Int(value) => Some(Money::from_cents(value.saturating_mul(100))),
            FieldValue::Float(value) => Money::from_f64(*value),
            FieldValue::Text(text) => text.parse().ok(),
        };
        money.ok_or_else(|| invalid(format!("Invalid {field}")))
    }
}

fn invalid(message: impl Into<String>) -> SagaError {
    SagaError::Validation(message.into())
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(invalid(format!("Missing {field}"))),
    }
}

fn required_value<'a>(value: &'a Option<FieldValue>, field: &str) -> Result<&'a FieldValue> {
    value
        .as_ref()
        .ok_or_else(|| invalid(format!("Missing {field}")))
}

fn user_id(value: &Option<FieldValue>) -> Result<UserId> {
    required_value(value, "user_id")?.as_id("user ID", |id| UserId::positive(id).ok())
}

fn email(value: &Option<String>) -> Result<String> {
    let email = required(value, "email")?;
    if !email.contains('@') {
        return Err(invalid("Invalid email address"));
    }
    Ok(email.to_string())
}

/// Body of a reservation payment request.
///
/// Unknown fields such as `rental_duration` or `price_per_hour` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationRequest {
    pub user_id: Option<FieldValue>,
    pub vehicle_id: Option<FieldValue>,
    #[serde(alias = "start_date")]
    pub start: Option<String>,
    #[serde(alias = "end_date")]
    pub end: Option<String>,
    pub payment_method: Option<String>,
    pub total_price: Option<FieldValue>,
    pub email: Option<String>,
}

/// A validated reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub interval: RentalInterval,
    pub total_price: Money,
    pub payment_method: String,
    pub email: String,
}

impl ReservationRequest {
    pub fn validate(&self) -> Result<Reservation> {
        let user_id = user_id(&self.user_id)?;
        let vehicle_id = required_value(&self.vehicle_id, "vehicle_id")?
            .as_id("vehicle ID", |id| VehicleId::positive(id).ok())?;
        let start = parse_timestamp("start date", required(&self.start, "start date")?)?;
        let end = parse_timestamp("end date", required(&self.end, "end date")?)?;
        let interval = RentalInterval::new(start, end)?;
        let total_price = required_value(&self.total_price, "total_price")?.as_money("total price")?;
        let payment_method = required(&self.payment_method, "payment_method")?.to_string();

        Ok(Reservation {
            user_id,
            vehicle_id,
            interval,
            total_price,
            payment_method,
            email: email(&self.email)?,
        })
    }
}

/// Body of a membership payment request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipPaymentRequest {
    pub user_id: Option<FieldValue>,
    pub membership_level: Option<String>,
    pub amount: Option<FieldValue>,
    pub payment_method: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub email: Option<String>,
}

/// A validated membership purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipPurchase {
    pub user_id: UserId,
    pub term: MembershipTerm,
    pub amount: Money,
    pub payment_method: String,
    pub email: String,
}

impl MembershipPaymentRequest {
    pub fn validate(&self) -> Result<MembershipPurchase> {
        let user_id = user_id(&self.user_id)?;
        let level = required(&self.membership_level, "membership_level")?.to_string();
        let amount = required_value(&self.amount, "amount")?.as_money("amount")?;
        let payment_method = required(&self.payment_method, "payment_method")?.to_string();
        let start: NaiveDate = parse_date("start date", required(&self.start_date, "start date")?)?;
        let end: NaiveDate = parse_date("end date", required(&self.end_date, "end date")?)?;
        if end <= start {
            return Err(invalid("Membership end date must be after its start date"));
        }

        Ok(MembershipPurchase {
            user_id,
            term: MembershipTerm { level, start, end },
            amount,
            payment_method,
            email: email(&self.email)?,
        })
    }
}
