use std::sync::Arc;

use async_trait::async_trait;
use tandem_core::{broker::IdentityBroker, queue::QueueHandle};
use tandem_model::{Job, NegotiateResponse, PROP_SENDER_IDENTITY, RelayEnvelope};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::handler::ApiHandler;

/// [`ApiHandler`] backed by the [`IdentityBroker`] and the job topic.
pub struct BrokerAdapter {
    broker: Arc<IdentityBroker>,
    jobs: QueueHandle,
}

impl BrokerAdapter {
    pub fn new(broker: Arc<IdentityBroker>, jobs: QueueHandle) -> Self {
        Self { broker, jobs }
    }
}

#[async_trait]
impl ApiHandler for BrokerAdapter {
    async fn negotiate_device(
        &self,
        api_key: Option<&str>,
        identity: &str,
    ) -> Result<NegotiateResponse, ApiError> {
        let descriptor = self.broker.negotiate(api_key, identity).await?;
        Ok(NegotiateResponse::new(descriptor.into_inner()))
    }

    async fn negotiate_group(
        &self,
        api_key: Option<&str>,
        user_id: &str,
        group_id: &str,
    ) -> Result<NegotiateResponse, ApiError> {
        let descriptor = self
            .broker
            .negotiate_group(api_key, user_id, group_id)
            .await?;
        Ok(NegotiateResponse::new(descriptor.into_inner()))
    }

    async fn deregister(&self, api_key: Option<&str>, identity: &str) -> Result<(), ApiError> {
        self.broker.revoke(api_key, identity).await.map_err(ApiError::from)
    }

    async fn submit_job(&self, api_key: Option<&str>, body: &[u8]) -> Result<Job, ApiError> {
        self.broker.authorize(api_key)?;
        let job = Job::from_slice(body)?;

        let envelope = RelayEnvelope::new(job.to_vec()?)
            .with_property(PROP_SENDER_IDENTITY, job.scheduler_identity().to_string());
        self.jobs.send(envelope).await?;
        info!(job = %job.correlation_id, queue = self.jobs.name(), steps = job.steps.len(), "job submitted");
        Ok(job)
    }

    async fn broadcast(&self, api_key: Option<&str>, payload: Vec<u8>) -> Result<usize, ApiError> {
        self.broker.authorize(api_key)?;
        let delivered = self.broker.hub().broadcast_all(payload);
        debug!(delivered, "broadcast accepted");
        Ok(delivered)
    }
}
