use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason a message was removed from the inbound queue without being forwarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeadLetterReason {
    /// No sender identity, or one without the `role::correlation-id` shape.
    IdentityMissing,
    /// The counterpart was never registered or is already gone.
    CounterpartNotFound,
    /// The delivery channel failed for any other reason.
    DeliveryFailed,
    /// The payload is not a valid protocol document.
    SerializationError,
}

impl DeadLetterReason {
    /// Return label value for metrics and the dead-letter reason string.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            DeadLetterReason::IdentityMissing => "IdentityMissing",
            DeadLetterReason::CounterpartNotFound => "CounterpartNotFound",
            DeadLetterReason::DeliveryFailed => "DeliveryFailed",
            DeadLetterReason::SerializationError => "SerializationError",
        }
    }
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Dead-letter record: a reason plus a description for operators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub reason: DeadLetterReason,
    pub description: String,
}

impl DeadLetter {
    pub fn new(reason: DeadLetterReason, description: impl Into<String>) -> Self {
        Self {
            reason,
            description: description.into(),
        }
    }
}

impl fmt::Display for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.description)
    }
}
