//! Integration tests for the booking ledger.
//!
//! These tests drive the ledger against the in-memory store and cover the
//! double-booking guard, modification rules and restartable listings.

use chrono::{NaiveDate, NaiveDateTime};
use domain::{BookingLedger, DomainError};
use futures_util::TryStreamExt;
use storage::{BookingChanges, InMemoryStore, Money, NewBooking, UserId, VehicleId};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

async fn setup() -> (BookingLedger<InMemoryStore>, VehicleId, VehicleId) {
    let store = InMemoryStore::new();
    let leaf = store
        .add_vehicle("Nissan Leaf", "Airport", Some(55), Money::from_dollars(10))
        .await;
    let kona = store
        .add_vehicle("Hyundai Kona", "Harbourfront", None, Money::from_dollars(12))
        .await;
    (BookingLedger::new(store), leaf, kona)
}

fn request(vehicle_id: VehicleId, user: i64, start: NaiveDateTime, end: NaiveDateTime) -> NewBooking {
    NewBooking {
        vehicle_id,
        user_id: UserId::new(user),
        start,
        end,
        total_price: Money::from_dollars(30),
    }
}

mod double_booking {
    use super::*;

    #[tokio::test]
    async fn overlapping_request_is_a_conflict() {
        let (ledger, leaf, _) = setup().await;
        ledger
            .create(request(leaf, 1, at(1, 10), at(1, 12)))
            .await
            .unwrap();

        let err = ledger
            .create(request(leaf, 2, at(1, 11), at(1, 13)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn touching_and_other_vehicle_are_allowed() {
        let (ledger, leaf, kona) = setup().await;
        ledger
            .create(request(leaf, 1, at(1, 10), at(1, 12)))
            .await
            .unwrap();

        assert!(ledger.create(request(leaf, 2, at(1, 12), at(1, 14))).await.is_ok());
        assert!(ledger.create(request(kona, 2, at(1, 10), at(1, 12))).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_creates_have_exactly_one_winner() {
        let (ledger, leaf, _) = setup().await;

        let handles: Vec<_> = (1..=10)
            .map(|user| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .create(request(leaf, user, at(2, 9), at(2, 17)))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(DomainError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 9);
    }
}

mod modification {
    use super::*;

    #[tokio::test]
    async fn modify_may_overlap_its_own_interval() {
        let (ledger, leaf, _) = setup().await;
        let booking = ledger
            .create(request(leaf, 1, at(3, 10), at(3, 12)))
            .await
            .unwrap();

        let updated = ledger
            .modify(
                booking.id,
                BookingChanges {
                    start: at(3, 11),
                    end: at(3, 14),
                    total_price: Money::from_dollars(45),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.end, at(3, 14));
        assert_eq!(updated.total_price, Money::from_dollars(45));
    }

    #[tokio::test]
    async fn modify_into_another_booking_is_a_conflict() {
        let (ledger, leaf, _) = setup().await;
        let first = ledger
            .create(request(leaf, 1, at(3, 10), at(3, 12)))
            .await
            .unwrap();
        ledger
            .create(request(leaf, 2, at(3, 14), at(3, 16)))
            .await
            .unwrap();

        let err = ledger
            .modify(
                first.id,
                BookingChanges {
                    start: at(3, 13),
                    end: at(3, 15),
                    total_price: Money::from_dollars(30),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let unchanged = ledger.get(first.id).await.unwrap();
        assert_eq!(unchanged.booking.start, at(3, 10));
    }

    #[tokio::test]
    async fn modify_missing_booking_is_not_found() {
        let (ledger, _, _) = setup().await;
        let err = ledger
            .modify(
                storage::BookingId::new(404),
                BookingChanges {
                    start: at(3, 10),
                    end: at(3, 12),
                    total_price: Money::from_dollars(30),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}

mod reads_and_cancel {
    use super::*;

    #[tokio::test]
    async fn get_is_enriched_with_vehicle() {
        let (ledger, _, kona) = setup().await;
        let booking = ledger
            .create(request(kona, 1, at(4, 8), at(4, 10)))
            .await
            .unwrap();

        let details = ledger.get(booking.id).await.unwrap();
        assert_eq!(details.model, "Hyundai Kona");
        assert_eq!(details.location, "Harbourfront");
        assert_eq!(details.charge_level, None);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (ledger, leaf, _) = setup().await;
        let booking = ledger
            .create(request(leaf, 1, at(4, 8), at(4, 10)))
            .await
            .unwrap();

        ledger.cancel(booking.id).await.unwrap();
        ledger.cancel(booking.id).await.unwrap();

        let err = ledger.get(booking.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(ledger.create(request(leaf, 2, at(4, 8), at(4, 10))).await.is_ok());
    }

    #[tokio::test]
    async fn listings_are_restartable() {
        let (ledger, leaf, kona) = setup().await;
        for day in 5..10 {
            ledger
                .create(request(leaf, 1, at(day, 9), at(day, 11)))
                .await
                .unwrap();
        }
        ledger
            .create(request(kona, 2, at(5, 9), at(5, 11)))
            .await
            .unwrap();

        let first: Vec<_> = ledger.list_by_user(UserId::new(1)).try_collect().await.unwrap();
        let second: Vec<_> = ledger.list_by_user(UserId::new(1)).try_collect().await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);

        let slots: Vec<_> = ledger.list_by_vehicle(kona).try_collect().await.unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, at(5, 9));
    }
}
