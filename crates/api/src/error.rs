//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use saga::{SagaError, WorkflowReport, workflow};
use serde::Serialize;
use storage::{BookingId, PaymentId, StorageError};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Booking, pricing or catalog error.
    Domain(DomainError),
    /// Workflow step error outside of a workflow run.
    Saga(SagaError),
    /// A workflow run that stopped before completing.
    Workflow(WorkflowReport),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_id: Option<BookingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_id: Option<PaymentId>,
}

impl ErrorBody {
    fn message(error: String) -> Self {
        Self {
            error,
            state: None,
            booking_id: None,
            payment_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::message(msg)),
            ApiError::Domain(err) => {
                let (status, msg) = domain_error_to_response(err);
                (status, ErrorBody::message(msg))
            }
            ApiError::Saga(err) => {
                let (status, msg) = saga_error_to_response(err, None);
                (status, ErrorBody::message(msg))
            }
            ApiError::Workflow(report) => workflow_error_to_response(report),
        };

        metrics::counter!("http_errors_total", "status" => status.as_str().to_string())
            .increment(1);
        (status, Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match err {
        DomainError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        DomainError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        DomainError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        DomainError::Storage(err) => storage_error_to_response(&err, INTERNAL_MESSAGE),
    }
}

fn storage_error_to_response(err: &StorageError, message: &str) -> (StatusCode, String) {
    tracing::error!(error = %err, "storage failure");
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

/// Maps a step error to a status and client message. Internal failures are
/// logged and described by the step they interrupted.
fn saga_error_to_response(err: SagaError, step: Option<&str>) -> (StatusCode, String) {
    match err {
        SagaError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        SagaError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        SagaError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        SagaError::Storage(err) => storage_error_to_response(&err, step_message(step)),
        SagaError::Dependency(err) => {
            tracing::error!(error = %err, "dependency failure");
            (StatusCode::BAD_GATEWAY, step_message(step).to_string())
        }
        SagaError::Notification(msg) => {
            tracing::error!(error = %msg, "notification failure");
            (StatusCode::INTERNAL_SERVER_ERROR, step_message(step).to_string())
        }
    }
}

fn step_message(step: Option<&str>) -> &'static str {
    match step {
        Some(workflow::STEP_RESERVE_BOOKING) => "Failed to reserve booking",
        Some(workflow::STEP_RECORD_PAYMENT) => "Failed to store payment details",
        Some(workflow::STEP_UPDATE_MEMBERSHIP) => "Failed to update membership tier",
        Some(workflow::STEP_SEND_INVOICE) => "Failed to send invoice email",
        _ => INTERNAL_MESSAGE,
    }
}

fn workflow_error_to_response(report: WorkflowReport) -> (StatusCode, ErrorBody) {
    let WorkflowReport {
        state,
        failed_step,
        error,
        booking_id,
        payment_id,
        ..
    } = report;

    let (status, error) = match error {
        Some(err) => saga_error_to_response(err, failed_step),
        None => {
            tracing::error!(%state, "workflow stopped without an error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    };

    (
        status,
        ErrorBody {
            error,
            state: Some(state.as_str()),
            booking_id,
            payment_id,
        },
    )
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

/// Errors that prevent a service from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
