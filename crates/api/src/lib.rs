//! HTTP services for vehicle booking and rental payments.
//!
//! The booking service exposes the booking ledger and the fleet; the payment
//! service runs the payment workflows and real-time billing. Both carry
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use domain::{BookingLedger, TierPricing};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    BookingReserver, HttpBookingReserver, HttpMembershipUpdater, HttpNotificationEmitter,
    LedgerReserver, LogNotificationEmitter, MembershipUpdater, NotificationEmitter, OutboundCall,
    PaymentCoordinator, Reconciler, ReqwestCaller, StoreMembershipUpdater,
};
use storage::RentalStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::{ApiError, StartupError};
use routes::bookings::BookingState;
use routes::payments::PaymentState;

/// Creates the booking service router with all routes and shared state.
pub fn create_booking_app<S: RentalStore>(
    state: Arc<BookingState<S>>,
    metrics_handle: PrometheusHandle,
    cors: CorsLayer,
) -> Router {
    let bookings = Router::new()
        .route("/api/v1/vehicle/booking", post(routes::bookings::create::<S>))
        .route(
            "/api/v1/vehicle/booking/{id}",
            get(routes::bookings::get::<S>)
                .put(routes::bookings::modify::<S>)
                .delete(routes::bookings::cancel::<S>),
        )
        .route(
            "/api/v1/vehicle/booking/user/{user_id}",
            get(routes::bookings::list_by_user::<S>),
        )
        .route(
            "/api/v1/vehicle/booking/vehicle/{vehicle_id}",
            get(routes::bookings::list_by_vehicle::<S>),
        )
        .route(
            "/api/v1/vehicle/availability",
            get(routes::vehicles::available::<S>),
        )
        .route("/api/v1/vehicle/status", get(routes::vehicles::status::<S>))
        .with_state(state);

    with_common_routes(bookings, metrics_handle, cors)
}

/// Creates the payment service router with all routes and shared state.
pub fn create_payment_app<S: RentalStore>(
    state: Arc<PaymentState<S>>,
    metrics_handle: PrometheusHandle,
    cors: CorsLayer,
) -> Router {
    let payments = Router::new()
        .route("/api/v1/payment/process", post(routes::payments::process::<S>))
        .route(
            "/api/v1/membership/payment",
            post(routes::payments::membership::<S>),
        )
        .route(
            "/api/v1/payment/real-time-bill",
            get(routes::payments::real_time_bill::<S>),
        )
        .route(
            "/api/v1/payment/reconciliation",
            get(routes::payments::reconciliation::<S>),
        )
        .with_state(state);

    with_common_routes(payments, metrics_handle, cors)
}

fn with_common_routes(router: Router, metrics_handle: PrometheusHandle, cors: CorsLayer) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    router
        .route("/health", get(routes::health::check))
        .merge(metrics_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Builds the CORS layer. An unset or unparsable origin allows any origin.
pub fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allow_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "invalid CORS_ALLOW_ORIGIN, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

/// Creates the booking service state over a store.
pub fn create_booking_state<S: RentalStore>(store: S) -> Arc<BookingState<S>> {
    Arc::new(BookingState {
        ledger: BookingLedger::new(store.clone()),
        catalog: store,
    })
}

/// The collaborators of the payment workflows.
pub struct Collaborators {
    pub reserver: Arc<dyn BookingReserver>,
    pub membership: Arc<dyn MembershipUpdater>,
    pub notifier: Arc<dyn NotificationEmitter>,
}

impl Collaborators {
    /// Collaborators running in this process on the shared store, with
    /// invoices written to the log.
    pub fn in_process<S: RentalStore>(store: &S) -> Self {
        Self {
            reserver: Arc::new(LedgerReserver::new(BookingLedger::new(store.clone()))),
            membership: Arc::new(StoreMembershipUpdater::new(store.clone())),
            notifier: Arc::new(LogNotificationEmitter),
        }
    }

    /// Collaborators for the configured service URLs. A collaborator without
    /// a URL runs in process.
    pub fn from_config<S: RentalStore>(config: &Config, store: &S) -> Result<Self, StartupError> {
        let mut collaborators = Self::in_process(store);
        if config.booking_service_url.is_none()
            && config.user_service_url.is_none()
            && config.notification_url.is_none()
        {
            return Ok(collaborators);
        }

        let caller: Arc<dyn OutboundCall> = Arc::new(
            ReqwestCaller::new(config.outbound_timeout)
                .map_err(|e| StartupError::HttpClient(e.to_string()))?,
        );
        if config.splits_booking_store() {
            tracing::warn!(
                "BOOKING_SERVICE_URL is set without DATABASE_URL; reconciliation only sees \
                 this service's in-memory store and will report booking payments as orphaned"
            );
        }
        if let Some(url) = &config.booking_service_url {
            tracing::info!(%url, "reserving bookings through the booking service");
            collaborators.reserver = Arc::new(HttpBookingReserver::new(caller.clone(), url));
        }
        if let Some(url) = &config.user_service_url {
            tracing::info!(%url, "updating membership tiers through the user service");
            collaborators.membership = Arc::new(HttpMembershipUpdater::new(caller.clone(), url));
        }
        if let Some(url) = &config.notification_url {
            tracing::info!(%url, "dispatching invoices to the notification endpoint");
            collaborators.notifier = Arc::new(HttpNotificationEmitter::new(caller, url));
        }
        Ok(collaborators)
    }
}

/// Creates the payment service state over a store and its collaborators.
pub fn create_payment_state<S: RentalStore>(
    store: S,
    collaborators: Collaborators,
) -> Arc<PaymentState<S>> {
    Arc::new(PaymentState {
        coordinator: PaymentCoordinator::new(
            store.clone(),
            collaborators.reserver,
            collaborators.membership,
            collaborators.notifier,
        ),
        pricing: TierPricing::new(store.clone()),
        reconciler: Reconciler::new(store),
    })
}
