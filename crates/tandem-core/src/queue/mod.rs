//! Shared inbound queue with peek-lock semantics.
use std::sync::Arc;

use async_trait::async_trait;
use tandem_model::{DeadLetter, RelayEnvelope};
use thiserror::Error;

/// A message received under lock. It stays invisible to other consumers until settled.
#[derive(Clone, Debug)]
pub struct QueuedMessage {
    pub lock_token: u64,
    pub delivery_count: u32,
    pub envelope: RelayEnvelope,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue '{0}' is closed")]
    Closed(String),

    #[error("message lock lost: {0}")]
    LockLost(String),

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

impl QueueError {
    /// Return label value for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Closed(_) => "closed",
            QueueError::LockLost(_) => "lock_lost",
            QueueError::Unavailable(_) => "unavailable",
        }
    }
}

/// Queue contract used by the relay router and the solver worker.
///
/// Every received message must end in exactly one of `complete`, `dead_letter`
/// or `abandon`.
#[async_trait]
pub trait MessageQueue: Send + Sync + 'static {
    /// Queue or topic name.
    fn name(&self) -> &str;

    async fn send(&self, envelope: RelayEnvelope) -> Result<(), QueueError>;

    /// Wait for the next message. `Ok(None)` once the queue is closed and drained.
    ///
    /// Must be cancel safe.
    async fn receive(&self) -> Result<Option<QueuedMessage>, QueueError>;

    /// Acknowledge and remove the message.
    async fn complete(&self, msg: &QueuedMessage) -> Result<(), QueueError>;

    /// Move the message to the dead-letter side channel.
    async fn dead_letter(&self, msg: &QueuedMessage, letter: DeadLetter) -> Result<(), QueueError>;

    /// Release the lock and make the message available for redelivery.
    async fn abandon(&self, msg: &QueuedMessage) -> Result<(), QueueError>;
}

pub type QueueHandle = Arc<dyn MessageQueue>;
