//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need Docker. Run with:
//!
//! ```bash
//! cargo test -p storage --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use serial_test::serial;
use sqlx::PgPool;
use storage::{
    BookingChanges, BookingQuery, BookingStore, MembershipStore, MembershipTerm, Money,
    NewBooking, NewPayment, PaymentStatus, PaymentStore, PostgresStore, StorageError, UserId,
    VehicleCatalog, VehicleId, booking_stream,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_rental_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Returns a store over cleared tables with a single vehicle in the catalog.
async fn get_test_store() -> (PostgresStore, VehicleId) {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE bookings, payments, user_memberships, vehicles RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    let vehicle_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO vehicles (model, location, charge_level, rental_price_per_hour_cents)
        VALUES ('Tesla Model 3', 'Downtown', 80, 1500)
        RETURNING vehicle_id
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    (
        PostgresStore::new(pool, Duration::from_secs(5)),
        VehicleId::new(vehicle_id),
    )
}

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn new_booking(vehicle_id: VehicleId, start: u32, end: u32) -> NewBooking {
    NewBooking {
        vehicle_id,
        user_id: UserId::new(7),
        start: at(start),
        end: at(end),
        total_price: Money::from_dollars(30),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn insert_and_read_joined_booking() {
    let (store, vehicle) = get_test_store().await;

    let booking = store.insert_booking(new_booking(vehicle, 10, 12)).await.unwrap();
    let details = store.get_booking(booking.id).await.unwrap().unwrap();

    assert_eq!(details.booking, booking);
    assert_eq!(details.model, "Tesla Model 3");
    assert_eq!(details.charge_level, Some(80));
    assert_eq!(details.hourly_rate, Money::from_cents(1500));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn exclusion_constraint_rejects_overlap_but_allows_touching() {
    let (store, vehicle) = get_test_store().await;
    store.insert_booking(new_booking(vehicle, 10, 12)).await.unwrap();

    let err = store
        .insert_booking(new_booking(vehicle, 11, 13))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Overlap { .. }));

    assert!(store.insert_booking(new_booking(vehicle, 12, 14)).await.is_ok());
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn unknown_vehicle_maps_from_foreign_key() {
    let (store, _) = get_test_store().await;

    let err = store
        .insert_booking(new_booking(VehicleId::new(9999), 10, 12))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UnknownVehicle(_)));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn concurrent_overlapping_inserts_have_one_winner() {
    let (store, vehicle) = get_test_store().await;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.insert_booking(new_booking(vehicle, 10, 12)).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn update_excludes_own_interval() {
    let (store, vehicle) = get_test_store().await;
    let booking = store.insert_booking(new_booking(vehicle, 10, 12)).await.unwrap();
    store.insert_booking(new_booking(vehicle, 14, 16)).await.unwrap();

    let updated = store
        .update_booking(
            booking.id,
            BookingChanges {
                start: at(11),
                end: at(13),
                total_price: Money::from_dollars(30),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.unwrap().end, at(13));

    let err = store
        .update_booking(
            booking.id,
            BookingChanges {
                start: at(13),
                end: at(15),
                total_price: Money::from_dollars(30),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Overlap { .. }));

    assert_eq!(
        store
            .count_overlapping(vehicle, at(11), at(13), Some(booking.id))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn stream_pages_user_bookings() {
    let (store, vehicle) = get_test_store().await;
    for hour in 0..5 {
        store
            .insert_booking(new_booking(vehicle, hour * 2, hour * 2 + 1))
            .await
            .unwrap();
    }

    let bookings: Vec<_> =
        booking_stream(store.clone(), BookingQuery::for_user(UserId::new(7)).page_size(2))
            .try_collect()
            .await
            .unwrap();

    assert_eq!(bookings.len(), 5);
    assert!(bookings.windows(2).all(|w| w[0].booking.id < w[1].booking.id));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn payments_and_memberships_round_through_tables() {
    let (store, _) = get_test_store().await;

    let payment = store
        .insert_payment(NewPayment {
            user_id: UserId::new(7),
            booking_id: None,
            amount: Money::from_dollars(50),
            method: "Card".to_string(),
            status: PaymentStatus::Completed,
            discount: Money::zero(),
            final_amount: Money::from_dollars(50),
            membership: Some(MembershipTerm {
                level: "Premium".to_string(),
                start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            }),
        })
        .await
        .unwrap();

    let loaded = store.get_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(loaded.membership.unwrap().level, "Premium");
    assert!(store.booking_payments().await.unwrap().is_empty());

    store.set_membership_level(UserId::new(7), "VIP").await.unwrap();
    store.set_membership_level(UserId::new(7), "Premium").await.unwrap();
    assert_eq!(
        store.membership_level(UserId::new(7)).await.unwrap().as_deref(),
        Some("Premium")
    );
    assert_eq!(store.discount_percentage("VIP").await.unwrap(), Some(20.0));
    assert_eq!(store.list_vehicles().await.unwrap().len(), 1);
}
