//! One logical channel between the two halves of a job, independent of the carrier.
//!
//! Implementations exist for the point-to-point device channel (through the relay
//! router) and for hub groups.
use std::sync::Arc;

use async_trait::async_trait;
use tandem_model::Identity;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Payload received on a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    /// Sender identity as reported by the carrier, if it reports one.
    pub sender: Option<String>,
    pub payload: Vec<u8>,
}

/// Stream of payloads addressed to one identity.
///
/// Dropping the subscription stops any background forwarding attached to it.
pub struct Subscription {
    identity: Identity,
    rx: mpsc::UnboundedReceiver<Inbound>,
    _guard: Option<DropGuard>,
}

impl Subscription {
    pub fn new(identity: Identity, rx: mpsc::UnboundedReceiver<Inbound>) -> Self {
        Self {
            identity,
            rx,
            _guard: None,
        }
    }

    /// Attach a token that is cancelled when the subscription goes away.
    pub fn with_stop_token(mut self, token: CancellationToken) -> Self {
        self._guard = Some(token.drop_guard());
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Next payload; `None` once the carrier closed the stream.
    pub async fn recv(&mut self) -> Option<Inbound> {
        self.rx.recv().await
    }

    /// Next payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<Inbound> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting payloads. Already queued payloads can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("recipient {recipient} is not the counterpart of {sender}")]
    NotCounterpart { sender: String, recipient: String },

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Transport name used in logs.
    fn name(&self) -> &'static str;

    /// Send `payload` from `sender` to `recipient`.
    async fn publish_to(
        &self,
        sender: &Identity,
        recipient: &Identity,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Open the stream of payloads addressed to `identity`.
    async fn subscribe(&self, identity: &Identity) -> Result<Subscription, TransportError>;

    /// Advisory cleanup once the identity reached a terminal state.
    async fn release(&self, _identity: &Identity) -> Result<(), TransportError> {
        Ok(())
    }
}

pub type TransportHandle = Arc<dyn Transport>;
