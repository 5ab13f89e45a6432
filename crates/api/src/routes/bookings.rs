//! Booking ledger endpoints of the booking service.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{BookingLedger, format_timestamp, parse_timestamp};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use storage::{
    BookingChanges, BookingDetails, BookingId, BookingSlot, Money, NewBooking, RentalStore,
    UserId, VehicleId,
};

use crate::error::ApiError;
use crate::routes::{MessageResponse, json_body};

/// Shared state of the booking service.
pub struct BookingState<S> {
    pub ledger: BookingLedger<S>,
    pub catalog: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub vehicle_id: i64,
    pub user_id: i64,
    pub booking_date: String,
    pub return_date: String,
    pub total_price: f64,
}

#[derive(Deserialize)]
pub struct ModifyBookingRequest {
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub total_price: Option<f64>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingCreatedResponse {
    pub booking_id: BookingId,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub booking_id: BookingId,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub booking_date: String,
    pub return_date: String,
    pub total_price: f64,
    pub model: String,
    pub location: String,
    pub charge_level: Option<i32>,
    pub rental_price_per_hour: f64,
}

impl From<BookingDetails> for BookingResponse {
    fn from(details: BookingDetails) -> Self {
        let booking = details.booking;
        Self {
            booking_id: booking.id,
            vehicle_id: booking.vehicle_id,
            user_id: booking.user_id,
            booking_date: format_timestamp(&booking.start),
            return_date: format_timestamp(&booking.end),
            total_price: booking.total_price.as_f64(),
            model: details.model,
            location: details.location,
            charge_level: details.charge_level,
            rental_price_per_hour: details.hourly_rate.as_f64(),
        }
    }
}

#[derive(Serialize)]
pub struct BookedSlotResponse {
    pub booking_date: String,
    pub return_date: String,
}

impl From<BookingSlot> for BookedSlotResponse {
    fn from(slot: BookingSlot) -> Self {
        Self {
            booking_date: format_timestamp(&slot.start),
            return_date: format_timestamp(&slot.end),
        }
    }
}

// -- Handlers --

/// POST /api/v1/vehicle/booking
#[tracing::instrument(skip(state, body))]
pub async fn create<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError> {
    let req = json_body(body, "Invalid input")?;

    let booking = NewBooking {
        vehicle_id: VehicleId::positive(req.vehicle_id)
            .map_err(|_| ApiError::BadRequest("Invalid vehicle ID".to_string()))?,
        user_id: UserId::positive(req.user_id)
            .map_err(|_| ApiError::BadRequest("Invalid user ID".to_string()))?,
        start: parse_timestamp("booking date", &req.booking_date)?,
        end: parse_timestamp("return date", &req.return_date)?,
        total_price: price(req.total_price)?,
    };

    let stored = state.ledger.create(booking).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            booking_id: stored.id,
        }),
    ))
}

/// GET /api/v1/vehicle/booking/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id: BookingId = parse_id(&id, "Invalid booking ID")?;
    let details = state.ledger.get(booking_id).await?;
    Ok(Json(details.into()))
}

/// PUT /api/v1/vehicle/booking/{id}
#[tracing::instrument(skip(state, body))]
pub async fn modify<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    Path(id): Path<String>,
    body: Result<Json<ModifyBookingRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let booking_id: BookingId = parse_id(&id, "Invalid booking ID")?;
    let req = json_body(body, "Invalid input")?;

    let (Some(start), Some(end), Some(total_price)) =
        (req.start_date_time, req.end_date_time, req.total_price)
    else {
        return Err(ApiError::BadRequest(
            "Missing or invalid fields in the input".to_string(),
        ));
    };

    let changes = BookingChanges {
        start: parse_timestamp("start date", &start)?,
        end: parse_timestamp("end date", &end)?,
        total_price: price(total_price)?,
    };
    state.ledger.modify(booking_id, changes).await?;

    Ok(Json(MessageResponse {
        message: "Booking updated successfully",
    }))
}

/// DELETE /api/v1/vehicle/booking/{id}
#[tracing::instrument(skip(state))]
pub async fn cancel<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let booking_id: BookingId = parse_id(&id, "Invalid booking ID")?;
    state.ledger.cancel(booking_id).await?;
    Ok(Json(MessageResponse {
        message: "Booking cancelled successfully",
    }))
}

/// GET /api/v1/vehicle/booking/user/{user_id}
#[tracing::instrument(skip(state))]
pub async fn list_by_user<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "Invalid user ID")?;
    let bookings: Vec<BookingResponse> = state
        .ledger
        .list_by_user(user_id)
        .map_ok(BookingResponse::from)
        .try_collect()
        .await?;
    Ok(Json(bookings))
}

/// GET /api/v1/vehicle/booking/vehicle/{vehicle_id}
#[tracing::instrument(skip(state))]
pub async fn list_by_vehicle<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Vec<BookedSlotResponse>>, ApiError> {
    let vehicle_id: VehicleId = parse_id(&vehicle_id, "Invalid vehicle ID")?;
    let slots: Vec<BookedSlotResponse> = state
        .ledger
        .list_by_vehicle(vehicle_id)
        .map_ok(BookedSlotResponse::from)
        .try_collect()
        .await?;
    Ok(Json(slots))
}

fn parse_id<T: FromStr>(raw: &str, message: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(message.to_string()))
}

fn price(value: f64) -> Result<Money, ApiError> {
    Money::from_f64(value).ok_or_else(|| ApiError::BadRequest("Invalid total price".to_string()))
}
