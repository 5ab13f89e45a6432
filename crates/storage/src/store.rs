use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures_core::Stream;

use crate::{
    BookingChanges, BookingDetails, BookingId, BookingQuery, BookingSlot, NewBooking, NewPayment,
    Payment, PaymentId, Result, UserId, Vehicle, VehicleId, model::Booking,
};

/// A lazy stream of bookings joined with vehicle attributes.
pub type BookingStream = Pin<Box<dyn Stream<Item = Result<BookingDetails>> + Send>>;

/// A lazy stream of booking intervals.
pub type SlotStream = Pin<Box<dyn Stream<Item = Result<BookingSlot>> + Send>>;

/// Persistence for booking rows, owned by the booking ledger.
///
/// Implementations must make the overlap test and the write that depends on
/// it a single atomic operation: of two concurrent writers with overlapping
/// intervals on the same vehicle, exactly one succeeds and the other gets
/// [`StorageError::Overlap`](crate::StorageError::Overlap).
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a booking and returns the stored row with its new ID.
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking>;

    /// Loads a booking joined with its vehicle. Returns None if absent.
    async fn get_booking(&self, booking_id: BookingId) -> Result<Option<BookingDetails>>;

    /// Replaces the interval and price of a booking.
    ///
    /// The overlap test ignores the booking being updated. Returns None if
    /// the booking does not exist.
    async fn update_booking(
        &self,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> Result<Option<Booking>>;

    /// Deletes a booking. Returns true if a row was removed.
    async fn delete_booking(&self, booking_id: BookingId) -> Result<bool>;

    /// Counts bookings of a vehicle with `start < end_at AND end > start_at`.
    async fn count_overlapping(
        &self,
        vehicle_id: VehicleId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<BookingId>,
    ) -> Result<u64>;

    /// Fetches one page of bookings matching the query, by ascending ID.
    async fn fetch_bookings(&self, query: &BookingQuery) -> Result<Vec<BookingDetails>>;

    /// Fetches one page of booking intervals matching the query, by ascending ID.
    async fn fetch_slots(&self, query: &BookingQuery) -> Result<Vec<BookingSlot>>;
}

/// Persistence for payment rows, owned by the payment recorder.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a payment and returns the stored row with its new ID.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment>;

    /// Loads a payment. Returns None if absent.
    async fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>>;

    /// Returns every payment that references a booking.
    async fn booking_payments(&self) -> Result<Vec<Payment>>;
}

/// Membership tier and discount lookups.
///
/// The tier of a user belongs to the user service; this trait is the read
/// (and tier-update) contract the payment side depends on.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Returns the membership level of a user, if the user is known.
    async fn membership_level(&self, user_id: UserId) -> Result<Option<String>>;

    /// Returns the discount percentage of a membership level, if defined.
    async fn discount_percentage(&self, level: &str) -> Result<Option<f64>>;

    /// Sets the membership level of a user.
    async fn set_membership_level(&self, user_id: UserId, level: &str) -> Result<()>;
}

/// Read-only access to the vehicle fleet.
#[async_trait]
pub trait VehicleCatalog: Send + Sync {
    /// Loads a vehicle. Returns None if absent.
    async fn get_vehicle(&self, vehicle_id: VehicleId) -> Result<Option<Vehicle>>;

    /// Lists all vehicles by ascending ID.
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>>;
}

/// A store implementing every persistence contract, shareable across tasks.
pub trait RentalStore:
    BookingStore + PaymentStore + MembershipStore + VehicleCatalog + Clone + 'static
{
}

impl<T> RentalStore for T where
    T: BookingStore + PaymentStore + MembershipStore + VehicleCatalog + Clone + 'static
{
}

/// Rows that can drive the keyset cursor of a paged stream.
trait Keyed {
    fn key(&self) -> BookingId;
}

impl Keyed for BookingDetails {
    fn key(&self) -> BookingId {
        self.booking.id
    }
}

impl Keyed for BookingSlot {
    fn key(&self) -> BookingId {
        self.booking_id
    }
}

struct PageState<T, F> {
    fetch: F,
    query: BookingQuery,
    buffer: VecDeque<T>,
    exhausted: bool,
}

/// Builds a lazy stream that fetches one page at a time.
///
/// Nothing is read until the stream is polled. The stream ends after a short
/// page, or after yielding the first error.
fn paged<T, F, Fut>(
    query: BookingQuery,
    fetch: F,
) -> Pin<Box<dyn Stream<Item = Result<T>> + Send>>
where
    T: Keyed + Send + 'static,
    F: Fn(BookingQuery) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
{
    let state = PageState {
        fetch,
        query,
        buffer: VecDeque::new(),
        exhausted: false,
    };

    let stream = futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Some((Ok(item), state));
            }
            if state.exhausted {
                return None;
            }
            match (state.fetch)(state.query.clone()).await {
                Ok(page) => {
                    if page.len() < state.query.page_size {
                        state.exhausted = true;
                    }
                    match page.last() {
                        Some(last) => state.query.after = Some(last.key()),
                        None => return None,
                    }
                    state.buffer.extend(page);
                }
                Err(e) => {
                    state.exhausted = true;
                    return Some((Err(e), state));
                }
            }
        }
    });

    Box::pin(stream)
}

/// Streams bookings (with vehicle attributes) matching the query.
///
/// Each call starts from the query's cursor, so a fresh call restarts the
/// sequence.
pub fn booking_stream<S>(store: S, query: BookingQuery) -> BookingStream
where
    S: BookingStore + Clone + 'static,
{
    paged(query, move |page| {
        let store = store.clone();
        async move { store.fetch_bookings(&page).await }
    })
}

/// Streams booking intervals matching the query.
pub fn slot_stream<S>(store: S, query: BookingQuery) -> SlotStream
where
    S: BookingStore + Clone + 'static,
{
    paged(query, move |page| {
        let store = store.clone();
        async move { store.fetch_slots(&page).await }
    })
}
