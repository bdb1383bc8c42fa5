mod domain;
pub use domain::{CorrelationId, IDENTITY_SEPARATOR, Identity, Properties, Role};

mod error;
pub use error::{ModelError, ModelResult};

mod job;
pub use job::{Job, JobStatus, JobUpdate, ProtocolMessage, RunnerCommand};

mod relay;
pub use relay::{DeadLetter, DeadLetterReason, PROP_FROM_IDENTITY, PROP_SENDER_IDENTITY, RelayEnvelope};

mod strategy;
pub use strategy::{BackoffStrategy, JitterStrategy, RestartStrategy};

mod api;
pub use api::NegotiateResponse;
