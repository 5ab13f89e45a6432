//! Collaborator traits for the workflow steps, with HTTP, in-process and
//! in-memory implementations.

pub mod booking;
pub mod membership;
pub mod notification;
pub mod outbound;

pub use booking::{BookingReserver, HttpBookingReserver, LedgerReserver};
pub use membership::{HttpMembershipUpdater, MembershipUpdater, StoreMembershipUpdater};
pub use notification::{
    HttpNotificationEmitter, InMemoryNotificationEmitter, Invoice, LogNotificationEmitter,
    NotificationEmitter,
};
pub use outbound::{
    DependencyError, OutboundCall, OutboundRequest, OutboundResponse, RecordingCaller,
    ReqwestCaller,
};
