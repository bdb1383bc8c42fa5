use std::sync::Arc;

use async_trait::async_trait;
use tandem_core::broker::{ApiKey, IdentityBroker};
use tandem_core::queue::QueueHandle;
use tandem_core::transport::{Subscription, Transport, TransportError};
use tandem_model::{Identity, PROP_SENDER_IDENTITY, RelayEnvelope};
use tracing::{debug, instrument};

use crate::MemoryRegistry;

/// Point-to-point transport: devices send into the shared inbound queue and the
/// relay router forwards to the counterpart's device inbox.
pub struct DeviceTransport {
    broker: Arc<IdentityBroker>,
    api_key: ApiKey,
    devices: Arc<MemoryRegistry>,
    inbound: QueueHandle,
}

impl DeviceTransport {
    /// `inbound` must be the queue the relay router consumes.
    pub fn new(
        broker: Arc<IdentityBroker>,
        api_key: ApiKey,
        devices: Arc<MemoryRegistry>,
        inbound: QueueHandle,
    ) -> Self {
        Self {
            broker,
            api_key,
            devices,
            inbound,
        }
    }
}

#[async_trait]
impl Transport for DeviceTransport {
    fn name(&self) -> &'static str {
        "device"
    }

    #[instrument(level = "debug", skip(self, payload), fields(sender = %sender, recipient = %recipient))]
    async fn publish_to(
        &self,
        sender: &Identity,
        recipient: &Identity,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        if *recipient != sender.counterpart() {
            return Err(TransportError::NotCounterpart {
                sender: sender.to_string(),
                recipient: recipient.to_string(),
            });
        }
        let envelope =
            RelayEnvelope::new(payload).with_property(PROP_SENDER_IDENTITY, sender.to_string());
        debug!(message = %envelope.message_id, "device message sent");
        self.inbound
            .send(envelope)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    #[instrument(level = "debug", skip(self), fields(identity = %identity))]
    async fn subscribe(&self, identity: &Identity) -> Result<Subscription, TransportError> {
        let descriptor = self
            .broker
            .negotiate(Some(self.api_key.expose()), &identity.to_string())
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;
        let rx = self
            .devices
            .connect(descriptor.expose())
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;
        Ok(Subscription::new(identity.clone(), rx))
    }

    async fn release(&self, identity: &Identity) -> Result<(), TransportError> {
        self.broker
            .revoke(Some(self.api_key.expose()), &identity.to_string())
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))
    }
}
