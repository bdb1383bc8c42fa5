use async_trait::async_trait;
use tandem_model::{Job, NegotiateResponse};

use crate::error::ApiError;

/// Relay API handler.
///
/// `api_key` is the raw `x-api-key` header value; every operation checks it before
/// doing anything else.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Issue a device connection descriptor for `identity`.
    async fn negotiate_device(
        &self,
        api_key: Option<&str>,
        identity: &str,
    ) -> Result<NegotiateResponse, ApiError>;

    /// Grant `user_id` access to `group_id` and return the hub endpoint.
    async fn negotiate_group(
        &self,
        api_key: Option<&str>,
        user_id: &str,
        group_id: &str,
    ) -> Result<NegotiateResponse, ApiError>;

    /// Remove `identity` and its grants. Unknown identities are not an error.
    async fn deregister(&self, api_key: Option<&str>, identity: &str) -> Result<(), ApiError>;

    /// Decode a job document and publish it onto the job topic.
    async fn submit_job(&self, api_key: Option<&str>, body: &[u8]) -> Result<Job, ApiError>;

    /// Send `payload` to every live hub connection. Returns the number of recipients.
    async fn broadcast(&self, api_key: Option<&str>, payload: Vec<u8>) -> Result<usize, ApiError>;
}
