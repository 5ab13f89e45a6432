//! Booking ledger: the only writer of booking rows.

use std::pin::Pin;

use futures_core::Stream;
use futures_util::TryStreamExt;
use storage::{
    Booking, BookingChanges, BookingDetails, BookingId, BookingQuery, BookingSlot, BookingStore,
    Money, NewBooking, UserId, VehicleCatalog, VehicleId, booking_stream, slot_stream,
};

use crate::availability::{AvailabilityChecker, RentalInterval};
use crate::error::{DomainError, Result};

/// A lazy, restartable sequence of ledger results.
pub type LedgerStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Creates, reads, modifies and cancels bookings.
///
/// Every write runs the availability check first so the common conflict
/// fails fast; the store rejects the loser of a concurrent race.
#[derive(Clone)]
pub struct BookingLedger<S> {
    store: S,
    availability: AvailabilityChecker<S>,
}

impl<S> BookingLedger<S>
where
    S: BookingStore + VehicleCatalog + Clone + 'static,
{
    /// Creates a ledger over the given store.
    pub fn new(store: S) -> Self {
        Self {
            availability: AvailabilityChecker::new(store.clone()),
            store,
        }
    }

    /// Returns the availability checker sharing this ledger's store.
    pub fn availability(&self) -> &AvailabilityChecker<S> {
        &self.availability
    }

    /// Creates a booking and returns the stored row.
    #[tracing::instrument(skip(self, booking), fields(vehicle_id = %booking.vehicle_id, user_id = %booking.user_id))]
    pub async fn create(&self, booking: NewBooking) -> Result<Booking> {
        let interval = RentalInterval::new(booking.start, booking.end)?;
        require_positive_price(booking.total_price)?;

        if self.store.get_vehicle(booking.vehicle_id).await?.is_none() {
            return Err(DomainError::validation(format!(
                "Unknown vehicle: {}",
                booking.vehicle_id
            )));
        }

        if !self
            .availability
            .is_available(booking.vehicle_id, interval, None)
            .await?
        {
            metrics::counter!("booking_conflicts_total").increment(1);
            return Err(DomainError::Conflict(format!(
                "Vehicle {} is not available for the selected dates",
                booking.vehicle_id
            )));
        }

        let stored = self.store.insert_booking(booking).await?;

        metrics::counter!("bookings_created_total").increment(1);
        tracing::info!(booking_id = %stored.id, "booking created");
        Ok(stored)
    }

    /// Loads a booking with the attributes of its vehicle.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, booking_id: BookingId) -> Result<BookingDetails> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Booking not found: {booking_id}")))
    }

    /// Replaces the interval and price of a booking.
    ///
    /// Nothing is written when validation fails. The new interval may overlap
    /// the booking's own old interval but no other booking of the vehicle.
    #[tracing::instrument(skip(self, changes))]
    pub async fn modify(&self, booking_id: BookingId, changes: BookingChanges) -> Result<Booking> {
        RentalInterval::new(changes.start, changes.end)?;
        require_positive_price(changes.total_price)?;

        let updated = self
            .store
            .update_booking(booking_id, changes)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Booking not found: {booking_id}")))?;

        tracing::info!(%booking_id, "booking modified");
        Ok(updated)
    }

    /// Cancels a booking. Cancelling an absent booking succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, booking_id: BookingId) -> Result<()> {
        let removed = self.store.delete_booking(booking_id).await?;
        tracing::info!(%booking_id, removed, "booking cancelled");
        Ok(())
    }

    /// Streams the bookings of a user, with vehicle attributes.
    pub fn list_by_user(&self, user_id: UserId) -> LedgerStream<BookingDetails> {
        Box::pin(
            booking_stream(self.store.clone(), BookingQuery::for_user(user_id))
                .map_err(DomainError::from),
        )
    }

    /// Streams the booked intervals of a vehicle.
    pub fn list_by_vehicle(&self, vehicle_id: VehicleId) -> LedgerStream<BookingSlot> {
        Box::pin(
            slot_stream(self.store.clone(), BookingQuery::for_vehicle(vehicle_id))
                .map_err(DomainError::from),
        )
    }
}

fn require_positive_price(total_price: Money) -> Result<()> {
    if total_price.is_positive() {
        Ok(())
    } else {
        Err(DomainError::validation("Total price must be greater than zero"))
    }
}
