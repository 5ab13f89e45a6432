//! Vehicle availability over half-open rental intervals.

use chrono::NaiveDateTime;
use storage::{BookingId, BookingStore, Vehicle, VehicleCatalog, VehicleId};

use crate::error::{DomainError, Result};

/// A half-open rental interval `[start, end)`.
///
/// Construction rejects zero-length and inverted intervals, so every value
/// has `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl RentalInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end <= start {
            return Err(DomainError::validation("End time must be after start time"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Returns true if the intervals share any instant. Touching intervals
    /// do not overlap.
    pub fn overlaps(&self, other: &RentalInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Returns the length of the interval in whole hours, rounded up.
    pub fn billable_hours(&self) -> u32 {
        let minutes = (self.end - self.start).num_minutes();
        u32::try_from((minutes + 59) / 60).unwrap_or(u32::MAX)
    }
}

/// Decides whether a vehicle is free for an interval.
///
/// This is the fast-path check; the store repeats it atomically with every
/// write.
#[derive(Clone)]
pub struct AvailabilityChecker<S> {
    store: S,
}

impl<S> AvailabilityChecker<S>
where
    S: BookingStore + VehicleCatalog,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns true if no booking of the vehicle overlaps the interval.
    ///
    /// `exclude` leaves one booking out of the test, for modifications.
    #[tracing::instrument(skip(self))]
    pub async fn is_available(
        &self,
        vehicle_id: VehicleId,
        interval: RentalInterval,
        exclude: Option<BookingId>,
    ) -> Result<bool> {
        let overlapping = self
            .store
            .count_overlapping(vehicle_id, interval.start, interval.end, exclude)
            .await?;
        Ok(overlapping == 0)
    }

    /// Lists every catalog vehicle that is free for the interval.
    #[tracing::instrument(skip(self))]
    pub async fn available_vehicles(&self, interval: RentalInterval) -> Result<Vec<Vehicle>> {
        let mut available = Vec::new();
        for vehicle in self.store.list_vehicles().await? {
            if self.is_available(vehicle.id, interval, None).await? {
                available.push(vehicle);
            }
        }
        Ok(available)
    }
}
