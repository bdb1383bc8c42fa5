use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("connection string is missing '{0}'")]
    MissingField(&'static str),

    #[error("malformed connection string segment #{0}")]
    Malformed(usize),

    #[error("credentials rejected for device '{0}'")]
    Rejected(String),
}
