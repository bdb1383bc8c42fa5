use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("access token is unknown or expired")]
    InvalidToken,

    #[error("'{user}' has no send rights for group '{group}'")]
    NotPermitted { user: String, group: String },
}
