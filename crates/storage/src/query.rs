use crate::{BookingId, UserId, VehicleId};

/// Default number of rows fetched per page when streaming bookings.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Filter and keyset cursor for paging through bookings.
///
/// Pages are ordered by ascending booking ID; `after` is the last ID of the
/// previous page.
#[derive(Debug, Clone)]
pub struct BookingQuery {
    /// Filter by the booking user.
    pub user_id: Option<UserId>,

    /// Filter by the booked vehicle.
    pub vehicle_id: Option<VehicleId>,

    /// Only return bookings with an ID greater than this one.
    pub after: Option<BookingId>,

    /// Maximum number of bookings per page.
    pub page_size: usize,
}

impl Default for BookingQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            vehicle_id: None,
            after: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BookingQuery {
    /// Creates a query over all bookings.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a query for the bookings of one user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Creates a query for the bookings of one vehicle.
    pub fn for_vehicle(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id: Some(vehicle_id),
            ..Default::default()
        }
    }

    /// Sets the page size. Zero is treated as one.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Moves the cursor past the given booking.
    pub fn after(mut self, booking_id: BookingId) -> Self {
        self.after = Some(booking_id);
        self
    }

    /// Returns true if a booking with these attributes passes the filters.
    pub fn matches(&self, id: BookingId, user_id: UserId, vehicle_id: VehicleId) -> bool {
        if let Some(after) = self.after
            && id <= after
        {
            return false;
        }
        if let Some(user) = self.user_id
            && user != user_id
        {
            return false;
        }
        if let Some(vehicle) = self.vehicle_id
            && vehicle != vehicle_id
        {
            return false;
        }
        true
    }
}
