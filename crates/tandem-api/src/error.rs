use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tandem_core::{broker::BrokerError, queue::QueueError};
use tandem_model::ModelError;
use thiserror::Error;
use tracing::error;

/// Errors returned by [`ApiHandler`](crate::ApiHandler) implementations.
///
/// Rendered as `{"error": <code>, "message": <text>}` with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A backing service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Unavailable(_) => "UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<BrokerError> for ApiError {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::Unauthorized => ApiError::Unauthorized,
            BrokerError::InvalidIdentity(msg) => ApiError::InvalidRequest(msg),
            BrokerError::RegistryUnavailable(msg) => ApiError::Unavailable(msg),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        ApiError::Unavailable(e.to_string())
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal api error");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
