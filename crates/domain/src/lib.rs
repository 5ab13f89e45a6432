//! Domain layer of the rental services.
//!
//! This crate provides the components that own the business rules:
//! - [`AvailabilityChecker`] and [`RentalInterval`] for overlap decisions
//! - [`BookingLedger`], the only writer of booking rows
//! - [`PaymentRecorder`], the only writer of payment rows
//! - [`TierPricing`] for membership discounts
//!
//! Components are generic over the storage traits and receive their store
//! at construction.

pub mod availability;
pub mod booking;
pub mod error;
pub mod payment;
pub mod pricing;
pub mod timestamp;

pub use availability::{AvailabilityChecker, RentalInterval};
pub use booking::{BookingLedger, LedgerStream};
pub use error::{DomainError, Result};
pub use payment::PaymentRecorder;
pub use pricing::{PriceQuote, TierPricing};
pub use timestamp::{format_timestamp, parse_date, parse_timestamp};
