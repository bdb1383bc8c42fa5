mod envelope;
pub use envelope::{PROP_FROM_IDENTITY, PROP_SENDER_IDENTITY, RelayEnvelope};

mod dead_letter;
pub use dead_letter::{DeadLetter, DeadLetterReason};
