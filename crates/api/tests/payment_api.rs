//! Integration tests for the payment service router.

use std::sync::{Arc, OnceLock};

use api::Collaborators;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use domain::BookingLedger;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryNotificationEmitter, LedgerReserver, StoreMembershipUpdater};
use serde_json::{Value, json};
use storage::{InMemoryStore, MembershipStore, UserId};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct Harness {
    app: Router,
    store: InMemoryStore,
    notifier: InMemoryNotificationEmitter,
}

async fn setup() -> Harness {
    let store = InMemoryStore::with_demo_fleet().await;
    let notifier = InMemoryNotificationEmitter::new();
    let collaborators = Collaborators {
        reserver: Arc::new(LedgerReserver::new(BookingLedger::new(store.clone()))),
        membership: Arc::new(StoreMembershipUpdater::new(store.clone())),
        notifier: Arc::new(notifier.clone()),
    };
    let app = api::create_payment_app(
        api::create_payment_state(store.clone(), collaborators),
        get_metrics_handle(),
        api::cors_layer(Some("http://localhost:8080")),
    );
    Harness {
        app,
        store,
        notifier,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn payment(vehicle_id: &str, start: &str, end: &str) -> Value {
    json!({
        "user_id": 1,
        "vehicle_id": vehicle_id,
        "start_date": start,
        "end_date": end,
        "payment_method": "Card",
        "rental_duration": "2",
        "price_per_hour": "15.00",
        "total_price": "30.00",
        "email": "rider@example.com"
    })
}

async fn process(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, "POST", "/api/v1/payment/process", Some(body)).await
}

fn membership(level: &str) -> Value {
    json!({
        "user_id": 1,
        "membership_level": level,
        "amount": 99.0,
        "payment_method": "Card",
        "start_date": "2025-01-01",
        "end_date": "2025-12-31",
        "email": "member@example.com"
    })
}

mod process_payment {
    use super::*;

    #[tokio::test]
    async fn test_completed_reservation() {
        let h = setup().await;

        let (status, json) = process(&h.app, payment("1", "2025-08-20T10:00", "2025-08-20T12:00")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Payment processed successfully");
        assert_eq!(json["booking_id"], 1);
        assert_eq!(json["payment_id"], 1);
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let h = setup().await;

        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/payment/process")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_vehicle_is_rejected() {
        let h = setup().await;

        let (status, json) = process(&h.app, payment("abc", "2025-08-20T10:00", "2025-08-20T12:00")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid vehicle ID");
        assert_eq!(json["state"], "RejectedInput");
        assert!(json.get("booking_id").is_none());
        assert_eq!(h.store.booking_count().await, 0);
    }

    #[tokio::test]
    async fn test_overlap_is_conflict() {
        let h = setup().await;
        process(&h.app, payment("2", "2025-08-20T10:00", "2025-08-20T12:00")).await;

        let (status, json) = process(&h.app, payment("2", "2025-08-20T11:30", "2025-08-20T12:30")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["state"], "RejectedConflict");
        assert_eq!(h.store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn test_payment_failure_reports_booking() {
        let h = setup().await;
        h.store.set_fail_payment_writes(true).await;

        let (status, json) = process(&h.app, payment("3", "2025-08-20T10:00", "2025-08-20T12:00")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to store payment details");
        assert_eq!(json["state"], "Failed");
        assert_eq!(json["booking_id"], 1);
        assert!(json.get("payment_id").is_none());
    }

    #[tokio::test]
    async fn test_notification_failure_reports_committed_ids() {
        let h = setup().await;
        h.notifier.set_fail_on_send(true);

        let (status, json) = process(&h.app, payment("1", "2025-08-20T10:00", "2025-08-20T12:00")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to send invoice email");
        assert_eq!(json["booking_id"], 1);
        assert_eq!(json["payment_id"], 1);
        assert_eq!(h.store.booking_count().await, 1);
        assert_eq!(h.store.payment_count().await, 1);
    }
}

mod membership_payment {
    use super::*;

    #[tokio::test]
    async fn test_membership_purchase_updates_tier() {
        let h = setup().await;

        let (status, json) = send(
            &h.app,
            "POST",
            "/api/v1/membership/payment",
            Some(membership("VIP")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Membership payment processed successfully");
        assert_eq!(json["membership_id"], 1);
        assert_eq!(json["membership_level"], "VIP");
        assert_eq!(
            h.store
                .membership_level(UserId::new(1))
                .await
                .unwrap()
                .as_deref(),
            Some("VIP")
        );
    }

    #[tokio::test]
    async fn test_missing_email_is_rejected() {
        let h = setup().await;
        let mut body = membership("Premium");
        body.as_object_mut().unwrap().remove("email");

        let (status, json) = send(&h.app, "POST", "/api/v1/membership/payment", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing email");
        assert_eq!(h.store.payment_count().await, 0);
    }
}

mod billing {
    use super::*;

    #[tokio::test]
    async fn test_bill_for_membership_level() {
        let h = setup().await;

        let (status, json) = send(
            &h.app,
            "GET",
            "/api/v1/payment/real-time-bill?membership_level=Premium&duration_hours=3&price_per_hour=15",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_price"], 45.0);
        assert_eq!(json["discount"], 4.5);
        assert_eq!(json["final_price"], 40.5);
        assert_eq!(json["membership"], "Premium");
        assert_eq!(json["duration"], 3);
    }

    #[tokio::test]
    async fn test_unknown_level_is_rejected() {
        let h = setup().await;

        let (status, json) = send(
            &h.app,
            "GET",
            "/api/v1/payment/real-time-bill?membership_level=Gold&duration_hours=3&price_per_hour=15",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid membership level");
    }

    #[tokio::test]
    async fn test_bill_for_user_tier_with_fallback() {
        let h = setup().await;
        h.store
            .set_membership_level(UserId::new(1), "VIP")
            .await
            .unwrap();

        let (_, member) = send(
            &h.app,
            "GET",
            "/api/v1/payment/real-time-bill?user_id=1&duration_hours=2&price_per_hour=10",
            None,
        )
        .await;
        assert_eq!(member["membership"], "VIP");
        assert_eq!(member["final_price"], 16.0);

        let (status, stranger) = send(
            &h.app,
            "GET",
            "/api/v1/payment/real-time-bill?user_id=42&duration_hours=2&price_per_hour=10",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(stranger["membership"].is_null());
        assert_eq!(stranger["discount"], 0.0);
        assert_eq!(stranger["final_price"], 20.0);
    }

    #[tokio::test]
    async fn test_invalid_duration_is_rejected() {
        let h = setup().await;

        let (status, json) = send(
            &h.app,
            "GET",
            "/api/v1/payment/real-time-bill?membership_level=Basic&duration_hours=two&price_per_hour=15",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid duration_hours");
    }

    #[tokio::test]
    async fn test_total_out_of_range_is_rejected() {
        let h = setup().await;

        for uri in [
            "/api/v1/payment/real-time-bill?membership_level=Basic&duration_hours=4000000000&price_per_hour=100000000000",
            "/api/v1/payment/real-time-bill?user_id=1&duration_hours=4000000000&price_per_hour=100000000000",
        ] {
            let (status, json) = send(&h.app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Invalid price_per_hour");
        }
    }
}

mod reconciliation {
    use super::*;

    #[tokio::test]
    async fn test_reports_booking_left_unpaid() {
        let h = setup().await;
        process(&h.app, payment("1", "2025-08-20T10:00", "2025-08-20T12:00")).await;

        let (status, json) = send(&h.app, "GET", "/api/v1/payment/reconciliation", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"unpaid_bookings": [], "orphaned_payments": []}));

        h.store.set_fail_payment_writes(true).await;
        process(&h.app, payment("2", "2025-08-20T10:00", "2025-08-20T12:00")).await;
        h.store.set_fail_payment_writes(false).await;

        let (_, json) = send(&h.app, "GET", "/api/v1/payment/reconciliation", None).await;
        let unpaid = json["unpaid_bookings"].as_array().unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0]["vehicle_id"], 2);
        assert_eq!(unpaid[0]["booking_date"], "2025-08-20 10:00:00");
    }
}
