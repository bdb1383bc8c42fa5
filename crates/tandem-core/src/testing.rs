//! In-memory collaborators shared by the unit tests of this crate.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tandem_model::{DeadLetter, Identity, JobUpdate, RelayEnvelope};
use tokio::sync::mpsc;

use crate::delivery::{Delivery, DeliveryError, Outbound};
use crate::queue::{MessageQueue, QueueError, QueuedMessage};
use crate::transport::{Inbound, Subscription, Transport, TransportError};

pub(crate) struct FakeQueue {
    name: String,
    next: AtomicU64,
    tx: Mutex<Option<mpsc::UnboundedSender<QueuedMessage>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedMessage>>,
    pub completed: Mutex<Vec<String>>,
    pub dead: Mutex<Vec<(String, DeadLetter)>>,
    pub abandoned: Mutex<Vec<String>>,
    pub fail_settle: AtomicBool,
    pub receive_failures: AtomicUsize,
}

impl FakeQueue {
    pub fn new(name: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.to_string(),
            next: AtomicU64::new(1),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            completed: Mutex::new(Vec::new()),
            dead: Mutex::new(Vec::new()),
            abandoned: Mutex::new(Vec::new()),
            fail_settle: AtomicBool::new(false),
            receive_failures: AtomicUsize::new(0),
        }
    }

    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    pub fn completed_ids(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn dead_letters(&self) -> Vec<(String, DeadLetter)> {
        self.dead.lock().unwrap().clone()
    }

    fn settle_check(&self) -> Result<(), QueueError> {
        if self.fail_settle.load(Ordering::SeqCst) {
            return Err(QueueError::LockLost("lock expired".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, envelope: RelayEnvelope) -> Result<(), QueueError> {
        let msg = QueuedMessage {
            lock_token: self.next.fetch_add(1, Ordering::SeqCst),
            delivery_count: 1,
            envelope,
        };
        match self.tx.lock().unwrap().as_ref() {
            Some(tx) => tx
                .send(msg)
                .map_err(|_| QueueError::Closed(self.name.clone())),
            None => Err(QueueError::Closed(self.name.clone())),
        }
    }

    async fn receive(&self) -> Result<Option<QueuedMessage>, QueueError> {
        let failing = self
            .receive_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(QueueError::Unavailable("broker timeout".into()));
        }
        Ok(self.rx.lock().await.recv().await)
    }

    async fn complete(&self, msg: &QueuedMessage) -> Result<(), QueueError> {
        self.settle_check()?;
        self.completed
            .lock()
            .unwrap()
            .push(msg.envelope.message_id.clone());
        Ok(())
    }

    async fn dead_letter(&self, msg: &QueuedMessage, letter: DeadLetter) -> Result<(), QueueError> {
        self.settle_check()?;
        self.dead
            .lock()
            .unwrap()
            .push((msg.envelope.message_id.clone(), letter));
        Ok(())
    }

    async fn abandon(&self, msg: &QueuedMessage) -> Result<(), QueueError> {
        self.abandoned
            .lock()
            .unwrap()
            .push(msg.envelope.message_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeDelivery {
    pub registered: Mutex<HashSet<String>>,
    pub delivered: Mutex<Vec<(Identity, Outbound)>>,
    pub failure: Mutex<Option<String>>,
    pub delay: Mutex<Option<Duration>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeDelivery {
    pub fn with_registered(ids: &[&str]) -> Self {
        let d = Self::default();
        d.registered
            .lock()
            .unwrap()
            .extend(ids.iter().map(|s| s.to_string()));
        d
    }

    pub fn delivered(&self) -> Vec<(Identity, Outbound)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    async fn deliver(&self, to: &Identity, msg: Outbound) -> Result<(), DeliveryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(DeliveryError::Failed(reason));
        }
        if !self.registered.lock().unwrap().contains(&to.to_string()) {
            return Err(DeliveryError::RecipientNotFound(to.to_string()));
        }
        self.delivered.lock().unwrap().push((to.clone(), msg));
        Ok(())
    }
}

type Hook = Box<dyn Fn(&JobUpdate) -> Option<Vec<u8>> + Send + Sync>;

/// Transport delivering straight into the recipient's subscription.
///
/// An optional hook can answer an update with a payload sent back to its sender.
#[derive(Default)]
pub(crate) struct LoopbackTransport {
    inboxes: Mutex<HashMap<String, mpsc::UnboundedSender<Inbound>>>,
    pub published: Mutex<Vec<(Identity, Identity, Vec<u8>)>>,
    pub released: Mutex<Vec<String>>,
    hook: Mutex<Option<Hook>>,
}

impl LoopbackTransport {
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: Fn(&JobUpdate) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        let t = Self::default();
        *t.hook.lock().unwrap() = Some(Box::new(hook));
        t
    }

    /// Push a payload into the inbox of `to`, as if `from` had sent it.
    pub fn inject(&self, from: &str, to: &Identity, payload: Vec<u8>) -> bool {
        match self.inboxes.lock().unwrap().get(&to.to_string()) {
            Some(tx) => tx
                .send(Inbound {
                    sender: Some(from.to_string()),
                    payload,
                })
                .is_ok(),
            None => false,
        }
    }

    pub fn is_subscribed(&self, id: &Identity) -> bool {
        self.inboxes
            .lock()
            .unwrap()
            .get(&id.to_string())
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Updates published by `sender`, decoded.
    pub fn updates_from(&self, sender: &Identity) -> Vec<JobUpdate> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, _)| s == sender)
            .filter_map(|(_, _, p)| JobUpdate::from_slice(p).ok())
            .collect()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn name(&self) -> &'static str {
        "loopback"
    }

    async fn publish_to(
        &self,
        sender: &Identity,
        recipient: &Identity,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.published
            .lock()
            .unwrap()
            .push((sender.clone(), recipient.clone(), payload.clone()));
        self.inject(&sender.to_string(), recipient, payload.clone());

        let reply = match (JobUpdate::from_slice(&payload), self.hook.lock().unwrap().as_ref()) {
            (Ok(update), Some(hook)) => hook(&update),
            _ => None,
        };
        if let Some(reply) = reply {
            self.inject(&recipient.to_string(), sender, reply);
        }
        Ok(())
    }

    async fn subscribe(&self, identity: &Identity) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.lock().unwrap().insert(identity.to_string(), tx);
        Ok(Subscription::new(identity.clone(), rx))
    }

    async fn release(&self, identity: &Identity) -> Result<(), TransportError> {
        self.inboxes.lock().unwrap().remove(&identity.to_string());
        self.released.lock().unwrap().push(identity.to_string());
        Ok(())
    }
}
