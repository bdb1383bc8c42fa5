use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid identity: {0} (expected role::correlation-id)")]
    InvalidIdentity(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("correlation id must not be empty")]
    EmptyCorrelationId,

    #[error("unknown job status: {0}")]
    UnknownStatus(String),

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("unknown restart strategy: {0}")]
    UnknownRestart(String),

    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Serialization(e.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
