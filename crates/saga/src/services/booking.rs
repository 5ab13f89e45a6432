//! Reservation step: creating the booking through the booking ledger.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{BookingLedger, format_timestamp};
use reqwest::Method;
use serde_json::json;
use storage::{BookingId, BookingStore, NewBooking, VehicleCatalog};

use crate::commands::Reservation;
use crate::error::{Result, SagaError};
use crate::services::outbound::{DependencyError, OutboundCall, OutboundRequest};

const SERVICE: &str = "booking";

/// Trait for creating the booking of a reservation.
#[async_trait]
pub trait BookingReserver: Send + Sync {
    /// Creates the booking and returns its ID.
    ///
    /// An overlap must surface as [`SagaError::Conflict`] and a rejected
    /// request as [`SagaError::Validation`].
    async fn reserve(&self, reservation: &Reservation) -> Result<BookingId>;
}

/// Reserves through a booking ledger sharing this process's store.
#[derive(Clone)]
pub struct LedgerReserver<S> {
    ledger: BookingLedger<S>,
}

impl<S> LedgerReserver<S>
where
    S: BookingStore + VehicleCatalog + Clone + 'static,
{
    pub fn new(ledger: BookingLedger<S>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl<S> BookingReserver for LedgerReserver<S>
where
    S: BookingStore + VehicleCatalog + Clone + 'static,
{
    async fn reserve(&self, reservation: &Reservation) -> Result<BookingId> {
        let booking = self
            .ledger
            .create(NewBooking {
                vehicle_id: reservation.vehicle_id,
                user_id: reservation.user_id,
                start: reservation.interval.start(),
                end: reservation.interval.end(),
                total_price: reservation.total_price,
            })
            .await?;
        Ok(booking.id)
    }
}

/// Reserves through the booking service's HTTP surface.
#[derive(Clone)]
pub struct HttpBookingReserver {
    caller: Arc<dyn OutboundCall>,
    url: String,
}

impl HttpBookingReserver {
    /// Creates a reserver for the booking service at `base_url`.
    pub fn new(caller: Arc<dyn OutboundCall>, base_url: &str) -> Self {
        Self {
            caller,
            url: format!("{}/api/v1/vehicle/booking", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl BookingReserver for HttpBookingReserver {
    #[tracing::instrument(skip(self, reservation), fields(vehicle_id = %reservation.vehicle_id))]
    async fn reserve(&self, reservation: &Reservation) -> Result<BookingId> {
        let response = self
            .caller
            .call(OutboundRequest {
                service: SERVICE,
                method: Method::POST,
                url: self.url.clone(),
                body: json!({
                    "vehicle_id": reservation.vehicle_id,
                    "user_id": reservation.user_id,
                    "booking_date": format_timestamp(&reservation.interval.start()),
                    "return_date": format_timestamp(&reservation.interval.end()),
                    "total_price": reservation.total_price.as_f64(),
                }),
            })
            .await?;

        match response.status {
            200 | 201 => response
                .body
                .get("booking_id")
                .and_then(serde_json::Value::as_i64)
                .and_then(|id| BookingId::positive(id).ok())
                .ok_or_else(|| {
                    SagaError::Dependency(DependencyError::Decode {
                        service: SERVICE,
                        message: "missing booking_id".to_string(),
                    })
                }),
            400 => Err(SagaError::Validation(
                response
                    .error_message()
                    .unwrap_or("Booking request rejected")
                    .to_string(),
            )),
            409 => Err(SagaError::Conflict(
                response
                    .error_message()
                    .unwrap_or("Vehicle is not available for the selected dates")
                    .to_string(),
            )),
            status => Err(DependencyError::Status {
                service: SERVICE,
                status,
            }
            .into()),
        }
    }
}
