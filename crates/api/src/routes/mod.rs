//! HTTP handlers for both services.

pub mod bookings;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod vehicles;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

use crate::error::ApiError;

/// Body of responses that only confirm an action.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Unwraps a JSON body, answering 400 with `message` when it does not parse.
pub(crate) fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected request body");
            Err(ApiError::BadRequest(message.to_string()))
        }
    }
}
