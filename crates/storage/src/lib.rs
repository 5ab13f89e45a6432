//! Persistence layer for the rental services.
//!
//! Each component owns its rows through a dedicated trait:
//! - [`BookingStore`] for the booking ledger
//! - [`PaymentStore`] for the payment recorder
//! - [`MembershipStore`] for tier and discount lookups
//! - [`VehicleCatalog`] for read-only fleet data
//!
//! [`InMemoryStore`] and [`PostgresStore`] implement all four. Both enforce
//! the no-overlap invariant atomically with the write that could break it.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{BookingId, Money, PaymentId, UserId, VehicleId};
pub use error::{Result, StorageError};
pub use memory::InMemoryStore;
pub use model::{
    Booking, BookingChanges, BookingDetails, BookingSlot, MembershipTerm, NewBooking, NewPayment,
    Payment, PaymentStatus, Vehicle,
};
pub use postgres::{PostgresConfig, PostgresStore};
pub use query::BookingQuery;
pub use store::{
    BookingStore, BookingStream, MembershipStore, PaymentStore, RentalStore, SlotStream,
    VehicleCatalog, booking_stream, slot_stream,
};
