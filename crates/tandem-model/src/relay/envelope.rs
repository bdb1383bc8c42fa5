use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Properties;

/// Property holding the identity of the participant that sent a message.
pub const PROP_SENDER_IDENTITY: &str = "iothub-connection-device-id";

/// Property stamped on forwarded messages with the original sender identity.
pub const PROP_FROM_IDENTITY: &str = "from-device";

/// In-flight message as seen by the relay router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEnvelope {
    pub message_id: String,
    pub payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl RelayEnvelope {
    /// Wrap a payload with a fresh message id and no properties.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            payload: payload.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.properties.insert(key, val);
        self
    }

    /// Raw sender identity property, if present.
    pub fn sender_identity(&self) -> Option<&str> {
        self.properties.get(PROP_SENDER_IDENTITY)
    }
}
