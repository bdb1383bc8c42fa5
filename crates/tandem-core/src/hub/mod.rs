//! Fan-out hub: broadcast to every connection and group-scoped broadcast.
//!
//! Group membership has no API of its own; it is a side effect of
//! [`FanoutHub::issue_access`], which the identity broker calls during negotiation.
//! Sender exclusion is left to receivers: [`GroupMessage::sender`] is compared
//! against the local identity.
mod connection;
pub use connection::{GroupMessage, HubConnection, HubEvent};

mod error;
pub use error::HubError;

mod token;
pub use token::AccessToken;

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

struct Grant {
    user_id: String,
    groups: Vec<String>,
    expires_at: Instant,
}

struct ConnectionEntry {
    user_id: String,
    tx: mpsc::UnboundedSender<HubEvent>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<u64, ConnectionEntry>,
    /// group id -> user ids
    members: HashMap<String, HashSet<String>>,
    grants: HashMap<AccessToken, Grant>,
}

impl HubState {
    /// Drop expired grants and the memberships they alone kept alive.
    ///
    /// A membership survives while the user holds another live grant for the group
    /// or still has an open connection. Groups left without members are removed.
    fn purge_expired(&mut self, now: Instant) -> usize {
        let mut lapsed = Vec::new();
        self.grants.retain(|_, g| {
            if g.expires_at > now {
                return true;
            }
            lapsed.extend(g.groups.iter().map(|group| (g.user_id.clone(), group.clone())));
            false
        });
        if lapsed.is_empty() {
            return 0;
        }

        let mut dropped = 0;
        for (user, group) in lapsed {
            let still_granted = self
                .grants
                .values()
                .any(|g| g.user_id == user && g.groups.contains(&group));
            let connected = self.connections.values().any(|c| c.user_id == user);
            if still_granted || connected {
                continue;
            }
            if let Some(users) = self.members.get_mut(&group) {
                if users.remove(&user) {
                    dropped += 1;
                }
                if users.is_empty() {
                    self.members.remove(&group);
                }
            }
        }
        dropped
    }

    /// Send to every connection accepted by `filter`, pruning closed ones.
    fn fan_out<F>(&mut self, event: &HubEvent, filter: F) -> usize
    where
        F: Fn(&ConnectionEntry) -> bool,
    {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, conn) in self.connections.iter() {
            if !filter(conn) {
                continue;
            }
            if conn.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            self.connections.remove(&id);
        }
        delivered
    }
}

/// In-process fan-out hub shared by all jobs.
pub struct FanoutHub {
    name: String,
    next_id: AtomicU64,
    state: RwLock<HubState>,
}

impl FanoutHub {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            state: RwLock::new(HubState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> RwLockReadGuard<'_, HubState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HubState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Grant `user_id` send and join rights for `groups` and issue a token valid for `ttl`.
    #[instrument(level = "debug", skip(self, groups), fields(hub = %self.name, user = %user_id))]
    pub fn issue_access<I, G>(&self, user_id: &str, groups: I, ttl: Duration) -> AccessToken
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        let now = Instant::now();
        let token = AccessToken::generate();
        let groups: Vec<String> = groups.into_iter().map(Into::into).collect();
        let mut state = self.write();
        let dropped = state.purge_expired(now);
        if dropped > 0 {
            trace!(dropped, "expired memberships purged");
        }

        for group in &groups {
            trace!(group = %group, "granting group membership");
            state
                .members
                .entry(group.clone())
                .or_default()
                .insert(user_id.to_string());
        }
        state.grants.insert(
            token.clone(),
            Grant {
                user_id: user_id.to_string(),
                groups,
                expires_at: now + ttl,
            },
        );
        token
    }

    /// Open a connection with a token issued by [`FanoutHub::issue_access`].
    pub fn connect(self: &Arc<Self>, token: &AccessToken) -> Result<HubConnection, HubError> {
        let user_id = {
            let mut state = self.write();
            let dropped = state.purge_expired(Instant::now());
            if dropped > 0 {
                trace!(hub = %self.name, dropped, "expired memberships purged");
            }
            match state.grants.get(token) {
                Some(g) => g.user_id.clone(),
                None => return Err(HubError::InvalidToken),
            }
        };
        Ok(self.connect_user(&user_id))
    }

    /// Open a connection for an already authenticated, in-process user.
    pub fn connect_user(self: &Arc<Self>, user_id: &str) -> HubConnection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.write().connections.insert(
            id,
            ConnectionEntry {
                user_id: user_id.to_string(),
                tx,
            },
        );
        debug!(hub = %self.name, user = %user_id, conn = id, "hub connection opened");

        HubConnection {
            id,
            user_id: user_id.to_string(),
            rx,
            hub: Arc::downgrade(self),
        }
    }

    pub(crate) fn unregister(&self, conn_id: u64) {
        if self.write().connections.remove(&conn_id).is_some() {
            trace!(hub = %self.name, conn = conn_id, "hub connection closed");
        }
    }

    /// Deliver `payload` to every live connection. Returns the number of recipients.
    pub fn broadcast_all(&self, payload: Vec<u8>) -> usize {
        let event = HubEvent::Broadcast { payload };
        let delivered = self.write().fan_out(&event, |_| true);
        debug!(hub = %self.name, delivered, "broadcast to all connections");
        delivered
    }

    /// Server-side group broadcast. Returns the number of recipients.
    pub fn broadcast_group(&self, group_id: &str, payload: Vec<u8>) -> usize {
        self.publish_group(group_id, None, payload)
    }

    /// Client-side group send; `sender` must be a member of `group_id`.
    pub fn send_to_group(
        &self,
        sender: &str,
        group_id: &str,
        payload: Vec<u8>,
    ) -> Result<usize, HubError> {
        let permitted = self
            .read()
            .members
            .get(group_id)
            .is_some_and(|users| users.contains(sender));
        if !permitted {
            return Err(HubError::NotPermitted {
                user: sender.to_string(),
                group: group_id.to_string(),
            });
        }
        Ok(self.publish_group(group_id, Some(sender.to_string()), payload))
    }

    fn publish_group(&self, group_id: &str, sender: Option<String>, payload: Vec<u8>) -> usize {
        let event = HubEvent::Group(GroupMessage {
            group_id: group_id.to_string(),
            sender,
            payload,
        });

        let mut state = self.write();
        let Some(members) = state.members.get(group_id).cloned() else {
            trace!(hub = %self.name, group = %group_id, "group has no members");
            return 0;
        };
        let delivered = state.fan_out(&event, |conn| members.contains(&conn.user_id));
        trace!(hub = %self.name, group = %group_id, delivered, "group message delivered");
        delivered
    }

    /// Drop every grant, membership and connection of `user_id`.
    pub fn revoke_user(&self, user_id: &str) {
        let mut state = self.write();
        state.grants.retain(|_, g| g.user_id != user_id);
        state.members.retain(|_, users| {
            users.remove(user_id);
            !users.is_empty()
        });
        state.connections.retain(|_, c| c.user_id != user_id);
        debug!(hub = %self.name, user = %user_id, "user revoked");
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    pub fn is_member(&self, user_id: &str, group_id: &str) -> bool {
        self.read()
            .members
            .get(group_id)
            .is_some_and(|users| users.contains(user_id))
    }
}
