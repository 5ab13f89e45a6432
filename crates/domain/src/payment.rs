//! Payment recorder: the only writer of payment rows.

use storage::{
    BookingId, MembershipTerm, Money, NewPayment, Payment, PaymentId, PaymentStatus, PaymentStore,
    UserId,
};

use crate::error::{DomainError, Result};

/// Records completed booking and membership payments.
///
/// The amount is recorded as given; no gateway is charged.
#[derive(Clone)]
pub struct PaymentRecorder<S> {
    store: S,
}

impl<S: PaymentStore> PaymentRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records the payment of a booking, without discount.
    #[tracing::instrument(skip(self))]
    pub async fn record_booking_payment(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        amount: Money,
        method: &str,
    ) -> Result<Payment> {
        let method = require_method(method)?;

        let payment = self
            .store
            .insert_payment(NewPayment {
                user_id,
                booking_id: Some(booking_id),
                amount,
                method,
                status: PaymentStatus::Completed,
                discount: Money::zero(),
                final_amount: amount,
                membership: None,
            })
            .await?;

        metrics::counter!("payments_recorded_total", "kind" => "booking").increment(1);
        tracing::info!(payment_id = %payment.id, "booking payment recorded");
        Ok(payment)
    }

    /// Records the purchase of a membership level.
    #[tracing::instrument(skip(self, term), fields(level = %term.level))]
    pub async fn record_membership_payment(
        &self,
        user_id: UserId,
        term: MembershipTerm,
        amount: Money,
        method: &str,
    ) -> Result<Payment> {
        let method = require_method(method)?;
        if term.level.trim().is_empty() {
            return Err(DomainError::validation("Membership level is required"));
        }
        if term.end <= term.start {
            return Err(DomainError::validation(
                "Membership end date must be after its start date",
            ));
        }

        let payment = self
            .store
            .insert_payment(NewPayment {
                user_id,
                booking_id: None,
                amount,
                method,
                status: PaymentStatus::Completed,
                discount: Money::zero(),
                final_amount: amount,
                membership: Some(term),
            })
            .await?;

        metrics::counter!("payments_recorded_total", "kind" => "membership").increment(1);
        tracing::info!(payment_id = %payment.id, "membership payment recorded");
        Ok(payment)
    }

    /// Loads a payment.
    pub async fn get(&self, payment_id: PaymentId) -> Result<Payment> {
        self.store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Payment not found: {payment_id}")))
    }
}

fn require_method(method: &str) -> Result<String> {
    let method = method.trim();
    if method.is_empty() {
        return Err(DomainError::validation("Payment method is required"));
    }
    Ok(method.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storage::InMemoryStore;

    fn term(level: &str, start_day: u32, end_day: u32) -> MembershipTerm {
        MembershipTerm {
            level: level.to_string(),
            start: NaiveDate::from_ymd_opt(2025, 1, start_day).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, end_day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_booking_payment_is_completed_without_discount() {
        let recorder = PaymentRecorder::new(InMemoryStore::new());

        let payment = recorder
            .record_booking_payment(
                UserId::new(1),
                BookingId::new(9),
                Money::from_dollars(40),
                "Card",
            )
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.booking_id, Some(BookingId::new(9)));
        assert_eq!(payment.discount, Money::zero());
        assert_eq!(payment.final_amount, Money::from_dollars(40));
        assert_eq!(recorder.get(payment.id).await.unwrap(), payment);
    }

    #[tokio::test]
    async fn test_membership_payment_has_no_booking() {
        let recorder = PaymentRecorder::new(InMemoryStore::new());

        let payment = recorder
            .record_membership_payment(
                UserId::new(1),
                term("Premium", 1, 31),
                Money::from_dollars(25),
                "PayNow",
            )
            .await
            .unwrap();

        assert!(payment.booking_id.is_none());
        assert_eq!(payment.membership.unwrap().level, "Premium");
    }

    #[tokio::test]
    async fn test_rejects_missing_method_and_inverted_term() {
        let store = InMemoryStore::new();
        let recorder = PaymentRecorder::new(store.clone());

        let err = recorder
            .record_booking_payment(UserId::new(1), BookingId::new(1), Money::from_dollars(1), " ")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = recorder
            .record_membership_payment(UserId::new(1), term("VIP", 10, 10), Money::zero(), "Card")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_payment_is_not_found() {
        let recorder = PaymentRecorder::new(InMemoryStore::new());
        let err = recorder.get(PaymentId::new(5)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
