use std::sync::Arc;

use async_trait::async_trait;
use tandem_core::broker::{ApiKey, IdentityBroker};
use tandem_core::hub::{AccessToken, FanoutHub, HubEvent};
use tandem_core::transport::{Inbound, Subscription, Transport, TransportError};
use tandem_model::Identity;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Group transport: both halves of a job join the hub group named after the
/// correlation id and exchange messages through it.
pub struct GroupTransport {
    broker: Arc<IdentityBroker>,
    api_key: ApiKey,
}

impl GroupTransport {
    pub fn new(broker: Arc<IdentityBroker>, api_key: ApiKey) -> Self {
        Self { broker, api_key }
    }

    fn hub(&self) -> &Arc<FanoutHub> {
        self.broker.hub()
    }
}

#[async_trait]
impl Transport for GroupTransport {
    fn name(&self) -> &'static str {
        "group"
    }

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
        let group = sender.correlation_id().as_str();
        let delivered = self
            .hub()
            .send_to_group(&sender.to_string(), group, payload)
            .map_err(|e| TransportError::Publish(e.to_string()))?;
        trace!(group, delivered, "group message sent");
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(identity = %identity))]
    async fn subscribe(&self, identity: &Identity) -> Result<Subscription, TransportError> {
        let group = identity.correlation_id().as_str().to_string();
        let descriptor = self
            .broker
            .negotiate_group(Some(self.api_key.expose()), &identity.to_string(), &group)
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;
        let token = AccessToken::from_descriptor(descriptor.expose())
            .ok_or_else(|| TransportError::Negotiation("descriptor carries no access token".into()))?;
        let mut conn = self
            .hub()
            .connect(&token)
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let guard = stop.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = guard.cancelled() => break,
                    event = conn.recv() => event,
                };
                let inbound = match event {
                    Some(HubEvent::Group(msg)) if msg.group_id == group => Inbound {
                        sender: msg.sender,
                        payload: msg.payload,
                    },
                    Some(HubEvent::Broadcast { payload }) => Inbound {
                        sender: None,
                        payload,
                    },
                    Some(HubEvent::Group(_)) => continue,
                    None => break,
                };
                if tx.send(inbound).is_err() {
                    break;
                }
            }
            debug!(group = %group, "group forwarder stopped");
        });

        Ok(Subscription::new(identity.clone(), rx).with_stop_token(stop))
    }

    /// Drop the identity's grants, group membership and open connections.
    async fn release(&self, identity: &Identity) -> Result<(), TransportError> {
        self.hub().revoke_user(&identity.to_string());
        Ok(())
    }
}
