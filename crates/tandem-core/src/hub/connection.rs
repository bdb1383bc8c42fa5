use std::sync::Weak;

use tokio::sync::mpsc;

use crate::hub::FanoutHub;

/// Message published to a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMessage {
    pub group_id: String,
    /// Publishing user, `None` for server-side broadcasts.
    pub sender: Option<String>,
    pub payload: Vec<u8>,
}

/// Event delivered to a hub connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubEvent {
    /// Sent to every connection.
    Broadcast { payload: Vec<u8> },
    /// Sent to the members of one group.
    Group(GroupMessage),
}

/// Live connection of one user. Unregisters itself when dropped.
pub struct HubConnection {
    pub(crate) id: u64,
    pub(crate) user_id: String,
    pub(crate) rx: mpsc::UnboundedReceiver<HubEvent>,
    pub(crate) hub: Weak<FanoutHub>,
}

impl HubConnection {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Next event; `None` once the hub dropped the connection (e.g. user revoked).
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<HubEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for HubConnection {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.id);
        }
    }
}
