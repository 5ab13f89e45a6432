//! Payment workflow and billing endpoints of the payment service.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use domain::{PriceQuote, TierPricing, format_timestamp};
use saga::{
    MembershipPaymentRequest, PaymentCoordinator, ReconciliationReport, Reconciler,
    ReservationRequest,
};
use serde::{Deserialize, Serialize};
use storage::{Booking, BookingId, Money, Payment, PaymentId, RentalStore, UserId, VehicleId};

use crate::error::ApiError;
use crate::routes::json_body;

/// Shared state of the payment service.
pub struct PaymentState<S> {
    pub coordinator: PaymentCoordinator<S>,
    pub pricing: TierPricing<S>,
    pub reconciler: Reconciler<S>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct BillQuery {
    pub membership_level: Option<String>,
    pub user_id: Option<String>,
    pub duration_hours: Option<String>,
    pub price_per_hour: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentProcessedResponse {
    pub message: &'static str,
    pub booking_id: BookingId,
    pub payment_id: PaymentId,
}

#[derive(Serialize)]
pub struct MembershipProcessedResponse {
    pub message: &'static str,
    pub membership_id: PaymentId,
    pub membership_level: String,
}

#[derive(Serialize)]
pub struct BillResponse {
    pub final_price: f64,
    pub discount: f64,
    pub total_price: f64,
    pub membership: Option<String>,
    pub duration: u32,
}

impl From<PriceQuote> for BillResponse {
    fn from(quote: PriceQuote) -> Self {
        Self {
            final_price: quote.final_price.as_f64(),
            discount: quote.discount.as_f64(),
            total_price: quote.total.as_f64(),
            membership: quote.membership,
            duration: quote.duration_hours,
        }
    }
}

#[derive(Serialize)]
pub struct UnpaidBookingResponse {
    pub booking_id: BookingId,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub booking_date: String,
    pub return_date: String,
    pub total_price: f64,
}

impl From<Booking> for UnpaidBookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            vehicle_id: booking.vehicle_id,
            user_id: booking.user_id,
            booking_date: format_timestamp(&booking.start),
            return_date: format_timestamp(&booking.end),
            total_price: booking.total_price.as_f64(),
        }
    }
}

#[derive(Serialize)]
pub struct OrphanedPaymentResponse {
    pub payment_id: PaymentId,
    pub booking_id: Option<BookingId>,
    pub user_id: UserId,
    pub amount: f64,
    pub payment_method: String,
    pub created_at: String,
}

impl From<Payment> for OrphanedPaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            user_id: payment.user_id,
            amount: payment.amount.as_f64(),
            payment_method: payment.method,
            created_at: payment.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ReconciliationResponse {
    pub unpaid_bookings: Vec<UnpaidBookingResponse>,
    pub orphaned_payments: Vec<OrphanedPaymentResponse>,
}

impl From<ReconciliationReport> for ReconciliationResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            unpaid_bookings: report.unpaid_bookings.into_iter().map(Into::into).collect(),
            orphaned_payments: report.orphaned_payments.into_iter().map(Into::into).collect(),
        }
    }
}

// -- Handlers --

/// POST /api/v1/payment/process
#[tracing::instrument(skip(state, body))]
pub async fn process<S: RentalStore>(
    State(state): State<Arc<PaymentState<S>>>,
    body: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Json<PaymentProcessedResponse>, ApiError> {
    let req = json_body(body, "Invalid payment request")?;
    let report = state.coordinator.execute_reservation(&req).await;

    match (report.is_completed(), report.booking_id, report.payment_id) {
        (true, Some(booking_id), Some(payment_id)) => Ok(Json(PaymentProcessedResponse {
            message: "Payment processed successfully",
            booking_id,
            payment_id,
        })),
        _ => Err(ApiError::Workflow(report)),
    }
}

/// POST /api/v1/membership/payment
#[tracing::instrument(skip(state, body))]
pub async fn membership<S: RentalStore>(
    State(state): State<Arc<PaymentState<S>>>,
    body: Result<Json<MembershipPaymentRequest>, JsonRejection>,
) -> Result<Json<MembershipProcessedResponse>, ApiError> {
    let req = json_body(body, "Invalid membership payment request")?;
    let report = state.coordinator.execute_membership_payment(&req).await;

    match (report.is_completed(), report.payment_id, report.membership_level.clone()) {
        (true, Some(membership_id), Some(membership_level)) => {
            Ok(Json(MembershipProcessedResponse {
                message: "Membership payment processed successfully",
                membership_id,
                membership_level,
            }))
        }
        _ => Err(ApiError::Workflow(report)),
    }
}

/// GET /api/v1/payment/real-time-bill
///
/// Prices by `membership_level` when given, otherwise by the tier of
/// `user_id`.
#[tracing::instrument(skip(state, query))]
pub async fn real_time_bill<S: RentalStore>(
    State(state): State<Arc<PaymentState<S>>>,
    Query(query): Query<BillQuery>,
) -> Result<Json<BillResponse>, ApiError> {
    let hours: u32 = query
        .duration_hours
        .as_deref()
        .and_then(|hours| hours.trim().parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid duration_hours".to_string()))?;
    let rate = query
        .price_per_hour
        .as_deref()
        .and_then(|rate| rate.parse::<Money>().ok())
        .filter(|rate| rate.cents() >= 0)
        .ok_or_else(|| ApiError::BadRequest("Invalid price_per_hour".to_string()))?;

    let level = query
        .membership_level
        .as_deref()
        .map(str::trim)
        .filter(|level| !level.is_empty());

    let quote = match (level, query.user_id.as_deref()) {
        (Some(level), _) => state.pricing.quote_for_level(level, hours, rate).await?,
        (None, Some(user_id)) => {
            let user_id: UserId = user_id
                .parse()
                .map_err(|_| ApiError::BadRequest("Invalid user ID".to_string()))?;
            state.pricing.compute_tier_price(user_id, hours, rate).await?
        }
        (None, None) => {
            return Err(ApiError::BadRequest("Invalid membership level".to_string()));
        }
    };

    Ok(Json(quote.into()))
}

/// GET /api/v1/payment/reconciliation
#[tracing::instrument(skip(state))]
pub async fn reconciliation<S: RentalStore>(
    State(state): State<Arc<PaymentState<S>>>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let report = state.reconciler.run().await?;
    Ok(Json(report.into()))
}
