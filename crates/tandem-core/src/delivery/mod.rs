//! Point-to-point delivery channel used by the relay router.
use std::sync::Arc;

use async_trait::async_trait;
use tandem_model::{Identity, Properties};
use thiserror::Error;

/// Message handed to the delivery channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub payload: Vec<u8>,
    pub properties: Properties,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The recipient is not registered.
    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("delivery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    async fn deliver(&self, to: &Identity, msg: Outbound) -> Result<(), DeliveryError>;
}

pub type DeliveryHandle = Arc<dyn Delivery>;
