use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Booking, BookingChanges, BookingDetails, BookingId, BookingQuery, BookingSlot, Money,
    NewBooking, NewPayment, Payment, PaymentId, Result, StorageError, UserId, Vehicle, VehicleId,
    store::{BookingStore, MembershipStore, PaymentStore, VehicleCatalog},
};

#[derive(Debug, Default)]
struct MemoryState {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    bookings: BTreeMap<BookingId, Booking>,
    payments: BTreeMap<PaymentId, Payment>,
    memberships: HashMap<UserId, String>,
    discounts: HashMap<String, f64>,
    next_booking_id: i64,
    next_payment_id: i64,
    fail_booking_writes: bool,
    fail_payment_writes: bool,
    fail_membership_reads: bool,
}

impl MemoryState {
    fn overlapping(
        &self,
        vehicle_id: VehicleId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<BookingId>,
    ) -> impl Iterator<Item = &Booking> {
        self.bookings.values().filter(move |b| {
            b.vehicle_id == vehicle_id
                && Some(b.id) != exclude
                && b.start < end
                && b.end > start
        })
    }

    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        let vehicle = self.vehicles.get(&booking.vehicle_id)?;
        Some(BookingDetails {
            booking: booking.clone(),
            model: vehicle.model.clone(),
            location: vehicle.location.clone(),
            charge_level: vehicle.charge_level,
            hourly_rate: vehicle.hourly_rate,
        })
    }
}

/// In-memory store implementation for tests and local runs.
///
/// All state sits behind one lock, so the overlap test and the write that
/// depends on it are never interleaved with another writer.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a small fleet and the standard discount
    /// tiers, for running the services without a database.
    pub async fn with_demo_fleet() -> Self {
        let store = Self::new();
        store
            .add_vehicle("Tesla Model 3", "Downtown", Some(80), Money::from_dollars(15))
            .await;
        store
            .add_vehicle("Nissan Leaf", "Airport", Some(65), Money::from_dollars(10))
            .await;
        store
            .add_vehicle("Hyundai Kona", "Harbourfront", None, Money::from_dollars(12))
            .await;
        store.set_discount("Basic", 0.0).await;
        store.set_discount("Premium", 10.0).await;
        store.set_discount("VIP", 20.0).await;
        store
    }

    /// Adds a clean vehicle to the catalog and returns its ID.
    pub async fn add_vehicle(
        &self,
        model: &str,
        location: &str,
        charge_level: Option<i32>,
        hourly_rate: Money,
    ) -> VehicleId {
        let mut state = self.state.write().await;
        let id = VehicleId::new(state.vehicles.len() as i64 + 1);
        state.vehicles.insert(
            id,
            Vehicle {
                id,
                model: model.to_string(),
                location: location.to_string(),
                charge_level,
                cleanliness_status: "Clean".to_string(),
                hourly_rate,
            },
        );
        id
    }

    /// Defines the discount percentage of a membership level.
    pub async fn set_discount(&self, level: &str, percentage: f64) {
        self.state
            .write()
            .await
            .discounts
            .insert(level.to_string(), percentage);
    }

    /// Makes booking inserts, updates and deletes fail.
    pub async fn set_fail_booking_writes(&self, fail: bool) {
        self.state.write().await.fail_booking_writes = fail;
    }

    /// Makes payment inserts fail.
    pub async fn set_fail_payment_writes(&self, fail: bool) {
        self.state.write().await.fail_payment_writes = fail;
    }

    /// Makes membership and discount lookups fail.
    pub async fn set_fail_membership_reads(&self, fail: bool) {
        self.state.write().await.fail_membership_reads = fail;
    }

    /// Returns the number of stored bookings.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }

    /// Returns the number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking> {
        let mut state = self.state.write().await;

        if state.fail_booking_writes {
            return Err(StorageError::Unavailable("booking writes disabled".to_string()));
        }
        if !state.vehicles.contains_key(&booking.vehicle_id) {
            return Err(StorageError::UnknownVehicle(booking.vehicle_id));
        }
        if state
            .overlapping(booking.vehicle_id, booking.start, booking.end, None)
            .next()
            .is_some()
        {
            return Err(StorageError::Overlap {
                vehicle_id: booking.vehicle_id,
                booking_id: None,
            });
        }

        state.next_booking_id += 1;
        let stored = Booking {
            id: BookingId::new(state.next_booking_id),
            vehicle_id: booking.vehicle_id,
            user_id: booking.user_id,
            start: booking.start,
            end: booking.end,
            total_price: booking.total_price,
        };
        state.bookings.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_booking(&self, booking_id: BookingId) -> Result<Option<BookingDetails>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .get(&booking_id)
            .and_then(|booking| state.details(booking)))
    }

    async fn update_booking(
        &self,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> Result<Option<Booking>> {
        let mut state = self.state.write().await;

        if state.fail_booking_writes {
            return Err(StorageError::Unavailable("booking writes disabled".to_string()));
        }
        let Some(vehicle_id) = state.bookings.get(&booking_id).map(|b| b.vehicle_id) else {
            return Ok(None);
        };
        if state
            .overlapping(vehicle_id, changes.start, changes.end, Some(booking_id))
            .next()
            .is_some()
        {
            return Err(StorageError::Overlap {
                vehicle_id,
                booking_id: Some(booking_id),
            });
        }

        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StorageError::Unavailable("booking vanished under lock".to_string()))?;
        booking.start = changes.start;
        booking.end = changes.end;
        booking.total_price = changes.total_price;
        Ok(Some(booking.clone()))
    }

    async fn delete_booking(&self, booking_id: BookingId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.fail_booking_writes {
            return Err(StorageError::Unavailable("booking writes disabled".to_string()));
        }
        Ok(state.bookings.remove(&booking_id).is_some())
    }

    async fn count_overlapping(
        &self,
        vehicle_id: VehicleId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<BookingId>,
    ) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.overlapping(vehicle_id, start, end, exclude).count() as u64)
    }

    async fn fetch_bookings(&self, query: &BookingQuery) -> Result<Vec<BookingDetails>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| query.matches(b.id, b.user_id, b.vehicle_id))
            .filter_map(|b| state.details(b))
            .take(query.page_size)
            .collect())
    }

    async fn fetch_slots(&self, query: &BookingQuery) -> Result<Vec<BookingSlot>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| query.matches(b.id, b.user_id, b.vehicle_id))
            .map(|b| BookingSlot {
                booking_id: b.id,
                start: b.start,
                end: b.end,
            })
            .take(query.page_size)
            .collect())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment> {
        let mut state = self.state.write().await;

        if state.fail_payment_writes {
            return Err(StorageError::Unavailable("payment writes disabled".to_string()));
        }

        state.next_payment_id += 1;
        let stored = Payment {
            id: PaymentId::new(state.next_payment_id),
            user_id: payment.user_id,
            booking_id: payment.booking_id,
            amount: payment.amount,
            method: payment.method,
            status: payment.status,
            discount: payment.discount,
            final_amount: payment.final_amount,
            membership: payment.membership,
            created_at: Utc::now(),
        };
        state.payments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&payment_id).cloned())
    }

    async fn booking_payments(&self) -> Result<Vec<Payment>> {
        Ok(self
            .state
            .read()
            .await
            .payments
            .values()
            .filter(|p| p.booking_id.is_some())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn membership_level(&self, user_id: UserId) -> Result<Option<String>> {
        let state = self.state.read().await;
        if state.fail_membership_reads {
            return Err(StorageError::Unavailable("membership reads disabled".to_string()));
        }
        Ok(state.memberships.get(&user_id).cloned())
    }

    async fn discount_percentage(&self, level: &str) -> Result<Option<f64>> {
        let state = self.state.read().await;
        if state.fail_membership_reads {
            return Err(StorageError::Unavailable("membership reads disabled".to_string()));
        }
        Ok(state.discounts.get(level).copied())
    }

    async fn set_membership_level(&self, user_id: UserId, level: &str) -> Result<()> {
        self.state
            .write()
            .await
            .memberships
            .insert(user_id, level.to_string());
        Ok(())
    }
}

#[async_trait]
impl VehicleCatalog for InMemoryStore {
    async fn get_vehicle(&self, vehicle_id: VehicleId) -> Result<Option<Vehicle>> {
        Ok(self.state.read().await.vehicles.get(&vehicle_id).cloned())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.state.read().await.vehicles.values().cloned().collect())
    }
}
