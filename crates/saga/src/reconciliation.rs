//! Reconciliation of bookings and payments committed by separate steps.

use std::collections::HashSet;

use futures_util::TryStreamExt;
use serde::Serialize;
use storage::{Booking, BookingQuery, BookingStore, Payment, PaymentStore, booking_stream};

use crate::error::{Result, SagaError};

/// Rows left inconsistent by workflows that stopped part-way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Bookings without any recorded payment.
    pub unpaid_bookings: Vec<Booking>,
    /// Booking payments whose booking no longer exists.
    pub orphaned_payments: Vec<Payment>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.unpaid_bookings.is_empty() && self.orphaned_payments.is_empty()
    }
}

/// Reads durable rows and reports "booked-but-unpaid" and
/// "paid-but-unbooked" records. It never repairs anything.
#[derive(Clone)]
pub struct Reconciler<S> {
    store: S,
}

impl<S> Reconciler<S>
where
    S: BookingStore + PaymentStore + Clone + 'static,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<ReconciliationReport> {
        let bookings: Vec<Booking> = booking_stream(self.store.clone(), BookingQuery::all())
            .map_ok(|details| details.booking)
            .try_collect()
            .await
            .map_err(SagaError::Storage)?;
        let payments = self
            .store
            .booking_payments()
            .await
            .map_err(SagaError::Storage)?;

        let paid: HashSet<_> = payments.iter().filter_map(|p| p.booking_id).collect();
        let booked: HashSet<_> = bookings.iter().map(|b| b.id).collect();

        let report = ReconciliationReport {
            unpaid_bookings: bookings
                .into_iter()
                .filter(|b| !paid.contains(&b.id))
                .collect(),
            orphaned_payments: payments
                .into_iter()
                .filter(|p| p.booking_id.is_some_and(|id| !booked.contains(&id)))
                .collect(),
        };

        tracing::info!(
            unpaid = report.unpaid_bookings.len(),
            orphaned = report.orphaned_payments.len(),
            "reconciliation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storage::{BookingId, InMemoryStore, Money, NewBooking, NewPayment, PaymentStatus, UserId};

    fn payment_for(booking_id: BookingId) -> NewPayment {
        NewPayment {
            user_id: UserId::new(1),
            booking_id: Some(booking_id),
            amount: Money::from_dollars(20),
            method: "Card".to_string(),
            status: PaymentStatus::Completed,
            discount: Money::zero(),
            final_amount: Money::from_dollars(20),
            membership: None,
        }
    }

    #[tokio::test]
    async fn test_reports_unpaid_and_orphaned_rows() {
        let store = InMemoryStore::new();
        let vehicle = store
            .add_vehicle("Nissan Leaf", "Airport", Some(50), Money::from_dollars(10))
            .await;
        let day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut bookings = Vec::new();
        for hour in [8, 12, 16] {
            let booking = store
                .insert_booking(NewBooking {
                    vehicle_id: vehicle,
                    user_id: UserId::new(1),
                    start: day.and_hms_opt(hour, 0, 0).unwrap(),
                    end: day.and_hms_opt(hour + 2, 0, 0).unwrap(),
                    total_price: Money::from_dollars(20),
                })
                .await
                .unwrap();
            bookings.push(booking);
        }

        store.insert_payment(payment_for(bookings[0].id)).await.unwrap();
        store.insert_payment(payment_for(bookings[2].id)).await.unwrap();
        store.delete_booking(bookings[2].id).await.unwrap();

        let report = Reconciler::new(store).run().await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.unpaid_bookings, vec![bookings[1].clone()]);
        assert_eq!(report.orphaned_payments.len(), 1);
        assert_eq!(report.orphaned_payments[0].booking_id, Some(bookings[2].id));
    }
}
