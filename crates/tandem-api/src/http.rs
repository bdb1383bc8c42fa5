use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use crate::{error::ApiError, handler::ApiHandler};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build the axum router.
    ///
    /// Routes:
    /// - GET /
    /// - GET /negotiate/{identity}
    /// - GET /negotiate/{user_id}/{group_id}
    /// - GET /deregister/{identity}
    /// - POST /jobs
    /// - POST /broadcast
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(hello))
            .route("/negotiate/{identity}", get(negotiate_device::<H>))
            .route("/negotiate/{user_id}/{group_id}", get(negotiate_group::<H>))
            .route("/deregister/{identity}", get(deregister::<H>))
            .route("/jobs", post(submit_job::<H>))
            .route("/broadcast", post(broadcast::<H>))
            .with_state(self.handler)
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct BroadcastResponse {
    delivered: usize,
}

// ============================================================================
// Handlers
// ============================================================================

async fn hello() -> &'static str {
    "Hello"
}

/// GET /negotiate/{identity}
async fn negotiate_device<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    Path(identity): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let resp = handler
        .negotiate_device(api_key(&headers), &identity)
        .await?;
    Ok(Json(resp))
}

/// GET /negotiate/{user_id}/{group_id}
async fn negotiate_group<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    Path((user_id, group_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let resp = handler
        .negotiate_group(api_key(&headers), &user_id, &group_id)
        .await?;
    Ok(Json(resp))
}

/// GET /deregister/{identity}
async fn deregister<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    Path(identity): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.deregister(api_key(&headers), &identity).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /jobs
async fn submit_job<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let job = handler.submit_job(api_key(&headers), &body).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// POST /broadcast
async fn broadcast<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let delivered = handler.broadcast(api_key(&headers), body.to_vec()).await?;
    Ok((StatusCode::ACCEPTED, Json(BroadcastResponse { delivered })))
}

/// A header that is not valid UTF-8 is treated as absent.
fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}
