use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// Missing or mismatching shared secret.
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Backing store could not be reached. Not retried here.
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),
}
