use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tandem_core::queue::{MessageQueue, QueueError, QueuedMessage};
use tandem_model::{DeadLetter, RelayEnvelope};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

#[derive(Default)]
struct Ledger {
    in_flight: HashMap<u64, QueuedMessage>,
    dead: Vec<(RelayEnvelope, DeadLetter)>,
    completed: u64,
}

/// Unbounded in-process queue with peek-lock settlement.
///
/// A received message is held in flight under a fresh lock token until it is
/// completed, dead-lettered or abandoned. Abandoned messages go back to the tail
/// with their delivery count kept.
pub struct MemoryQueue {
    name: String,
    next_token: AtomicU64,
    tx: Mutex<Option<mpsc::UnboundedSender<QueuedMessage>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedMessage>>,
    ledger: Mutex<Ledger>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            next_token: AtomicU64::new(1),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Stop accepting messages. Receivers drain what is queued, then see `Ok(None)`.
    pub fn close(&self) {
        if self.sender().take().is_some() {
            debug!(queue = %self.name, "queue closed");
        }
    }

    pub fn in_flight(&self) -> usize {
        self.ledger().in_flight.len()
    }

    pub fn completed(&self) -> u64 {
        self.ledger().completed
    }

    /// Dead-lettered envelopes with their reasons, oldest first.
    pub fn dead_letters(&self) -> Vec<(RelayEnvelope, DeadLetter)> {
        self.ledger().dead.clone()
    }

    fn sender(&self) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<QueuedMessage>>> {
        self.tx.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enqueue(&self, msg: QueuedMessage) -> Result<(), QueueError> {
        match self.sender().as_ref() {
            Some(tx) => tx
                .send(msg)
                .map_err(|_| QueueError::Closed(self.name.clone())),
            None => Err(QueueError::Closed(self.name.clone())),
        }
    }

    fn settle(&self, msg: &QueuedMessage) -> Result<QueuedMessage, QueueError> {
        self.ledger()
            .in_flight
            .remove(&msg.lock_token)
            .ok_or_else(|| QueueError::LockLost(msg.envelope.message_id.clone()))
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, envelope: RelayEnvelope) -> Result<(), QueueError> {
        trace!(queue = %self.name, message = %envelope.message_id, "message enqueued");
        self.enqueue(QueuedMessage {
            lock_token: 0,
            delivery_count: 0,
            envelope,
        })
    }

    async fn receive(&self) -> Result<Option<QueuedMessage>, QueueError> {
        let Some(mut msg) = self.rx.lock().await.recv().await else {
            return Ok(None);
        };
        msg.lock_token = self.next_token.fetch_add(1, Ordering::Relaxed);
        msg.delivery_count += 1;
        self.ledger().in_flight.insert(msg.lock_token, msg.clone());
        Ok(Some(msg))
    }

    async fn complete(&self, msg: &QueuedMessage) -> Result<(), QueueError> {
        self.settle(msg)?;
        self.ledger().completed += 1;
        Ok(())
    }

    async fn dead_letter(&self, msg: &QueuedMessage, letter: DeadLetter) -> Result<(), QueueError> {
        let held = self.settle(msg)?;
        debug!(queue = %self.name, message = %held.envelope.message_id, reason = %letter.reason, "message dead-lettered");
        self.ledger().dead.push((held.envelope, letter));
        Ok(())
    }

    async fn abandon(&self, msg: &QueuedMessage) -> Result<(), QueueError> {
        let held = self.settle(msg)?;
        let id = held.envelope.message_id.clone();
        if let Err(e) = self.enqueue(held) {
            warn!(queue = %self.name, message = %id, "abandoned message dropped, queue is closed");
            return Err(e);
        }
        Ok(())
    }
}
