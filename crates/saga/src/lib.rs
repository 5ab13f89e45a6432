//! Payment workflows for the rental services.
//!
//! The reservation workflow follows these steps:
//! 1. Validate the request
//! 2. Reserve the booking
//! 3. Record the payment
//! 4. Send the invoice
//!
//! The membership workflow records the payment, updates the user's tier and
//! sends the invoice. Steps commit independently and are never rolled back;
//! every run returns a [`WorkflowReport`], and the [`Reconciler`] finds rows
//! left behind by runs that stopped part-way.

pub mod commands;
pub mod coordinator;
pub mod error;
pub mod reconciliation;
pub mod report;
pub mod services;
pub mod state;
pub mod workflow;

pub use commands::{
    FieldValue, MembershipPaymentRequest, MembershipPurchase, Reservation, ReservationRequest,
};
pub use coordinator::PaymentCoordinator;
pub use error::{Result, SagaError};
pub use reconciliation::{ReconciliationReport, Reconciler};
pub use report::WorkflowReport;
pub use services::{
    BookingReserver, DependencyError, HttpBookingReserver, HttpMembershipUpdater,
    HttpNotificationEmitter, InMemoryNotificationEmitter, Invoice, LedgerReserver,
    LogNotificationEmitter, MembershipUpdater, NotificationEmitter, OutboundCall,
    OutboundRequest, OutboundResponse, RecordingCaller, ReqwestCaller, StoreMembershipUpdater,
};
pub use state::{WorkflowKind, WorkflowState};
