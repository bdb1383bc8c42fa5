mod role;
pub use role::Role;

mod correlation;
pub use correlation::CorrelationId;

mod identity;
pub use identity::{IDENTITY_SEPARATOR, Identity};

mod properties;
pub use properties::Properties;
