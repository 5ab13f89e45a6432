//! Fleet endpoints of the booking service.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::{DomainError, RentalInterval, parse_timestamp};
use serde::{Deserialize, Serialize};
use storage::{RentalStore, Vehicle, VehicleCatalog, VehicleId};

use crate::error::ApiError;
use crate::routes::bookings::BookingState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct VehicleResponse {
    pub vehicle_id: VehicleId,
    pub model: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_level: Option<i32>,
    pub cleanliness_status: String,
    pub rental_price_per_hour: f64,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            vehicle_id: vehicle.id,
            model: vehicle.model,
            location: vehicle.location,
            charge_level: vehicle.charge_level,
            cleanliness_status: vehicle.cleanliness_status,
            rental_price_per_hour: vehicle.hourly_rate.as_f64(),
        }
    }
}

/// GET /api/v1/vehicle/availability?start_date&end_date
#[tracing::instrument(skip(state, query))]
pub async fn available<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<VehicleResponse>>, ApiError> {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(ApiError::BadRequest(
            "start_date and end_date are required".to_string(),
        ));
    };
    let interval = RentalInterval::new(
        parse_timestamp("start date", &start)?,
        parse_timestamp("end date", &end)?,
    )?;

    let vehicles = state
        .ledger
        .availability()
        .available_vehicles(interval)
        .await?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// GET /api/v1/vehicle/status
#[tracing::instrument(skip(state))]
pub async fn status<S: RentalStore>(
    State(state): State<Arc<BookingState<S>>>,
) -> Result<Json<Vec<VehicleResponse>>, ApiError> {
    let vehicles = state
        .catalog
        .list_vehicles()
        .await
        .map_err(DomainError::from)?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}
