//! Workflow step names.

/// Step name: Check and normalize the request body.
pub const STEP_VALIDATE_REQUEST: &str = "validate_request";

/// Step name: Create the booking for the requested interval.
pub const STEP_RESERVE_BOOKING: &str = "reserve_booking";

/// Step name: Record the completed payment.
pub const STEP_RECORD_PAYMENT: &str = "record_payment";

/// Step name: Move the user to the purchased membership tier.
pub const STEP_UPDATE_MEMBERSHIP: &str = "update_membership";

/// Step name: Render and dispatch the invoice.
pub const STEP_SEND_INVOICE: &str = "send_invoice";
