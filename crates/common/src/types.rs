use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a string is not a valid positive identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    pub kind: &'static str,
    pub input: String,
}

impl std::fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid {}: {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseIdError {}

/// Declares a store-assigned integer identifier.
///
/// Identifiers are positive; zero and negative values never refer to a row.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier value.
            pub fn value(self) -> i64 {
                self.0
            }

            /// Validates a raw value, rejecting zero and negative numbers.
            pub fn positive(value: i64) -> Result<Self, ParseIdError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(ParseIdError {
                        kind: $kind,
                        input: value.to_string(),
                    })
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: i64 = s.trim().parse().map_err(|_| ParseIdError {
                    kind: $kind,
                    input: s.to_string(),
                })?;
                Self::positive(value).map_err(|_| ParseIdError {
                    kind: $kind,
                    input: s.to_string(),
                })
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of a booking row, assigned by the booking store.
    BookingId,
    "booking ID"
);

row_id!(
    /// Identifier of a payment row, assigned by the payment store.
    PaymentId,
    "payment ID"
);

row_id!(
    /// Identifier of a user account owned by the user service.
    UserId,
    "user ID"
);

row_id!(
    /// Identifier of a fleet vehicle.
    VehicleId,
    "vehicle ID"
);

/// Correlation identifier for a single workflow run.
///
/// Never persisted; it ties together log lines and the returned report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(Uuid);

impl WorkflowId {
    /// Creates a new random workflow ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
