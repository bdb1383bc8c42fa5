//! Relay router: forwards each inbound message to the counterpart of its sender.
//!
//! The counterpart is computed from the sender identity alone
//! ([`Identity::counterpart`]), so no routing table is needed. Every message ends
//! either forwarded and completed or dead-lettered with a reason; nothing is retried
//! here (redelivery is the queue's business).
mod config;
pub use config::RouterConfig;

mod error;
pub use error::{ErrorChannel, ProcessingError};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tandem_model::{
    DeadLetter, DeadLetterReason, IDENTITY_SEPARATOR, Identity, PROP_FROM_IDENTITY, Properties,
    ProtocolMessage, RelayEnvelope,
};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::delivery::{DeliveryError, DeliveryHandle, Outbound};
use crate::metrics::{MetricsHandle, noop_metrics};
use crate::queue::{QueueHandle, QueuedMessage};

/// Pause after a failed receive before polling the queue again.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Result of one routing decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Forwarded { to: Identity },
    DeadLettered(DeadLetter),
}

pub struct RelayRouter {
    queue: QueueHandle,
    delivery: DeliveryHandle,
    config: RouterConfig,
    metrics: MetricsHandle,
}

impl RelayRouter {
    pub fn new(queue: QueueHandle, delivery: DeliveryHandle) -> Self {
        Self {
            queue,
            delivery,
            config: RouterConfig::default(),
            metrics: noop_metrics(),
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Decide where `envelope` goes and attempt the delivery.
    ///
    /// Never fails: every problem becomes a dead-letter outcome.
    #[instrument(level = "debug", skip(self, envelope), fields(message = %envelope.message_id))]
    pub async fn route(&self, envelope: &RelayEnvelope) -> RouteOutcome {
        let raw = match envelope.sender_identity() {
            Some(raw) if raw.contains(IDENTITY_SEPARATOR) => raw,
            Some(raw) => {
                return dead(
                    DeadLetterReason::IdentityMissing,
                    format!("sender identity '{raw}' has no role separator"),
                );
            }
            None => {
                return dead(
                    DeadLetterReason::IdentityMissing,
                    "sender identity property is missing",
                );
            }
        };
        let sender = match Identity::parse(raw) {
            Ok(sender) => sender,
            Err(e) => return dead(DeadLetterReason::IdentityMissing, e.to_string()),
        };

        if self.config.validate_payloads {
            if let Err(e) = ProtocolMessage::decode(&envelope.payload) {
                return dead(DeadLetterReason::SerializationError, e.to_string());
            }
        }

        let to = sender.counterpart();
        let mut properties = Properties::new();
        properties.insert(PROP_FROM_IDENTITY, sender.to_string());
        let outbound = Outbound {
            payload: envelope.payload.clone(),
            properties,
        };

        trace!(from = %sender, to = %to, bytes = envelope.payload.len(), "forwarding");
        match self.delivery.deliver(&to, outbound).await {
            Ok(()) => RouteOutcome::Forwarded { to },
            Err(DeliveryError::RecipientNotFound(_)) => dead(
                DeadLetterReason::CounterpartNotFound,
                format!("counterpart '{to}' is not registered"),
            ),
            Err(e) => dead(DeadLetterReason::DeliveryFailed, e.to_string()),
        }
    }

    /// Route one queued message and settle it (complete or dead-letter).
    pub async fn process(&self, msg: QueuedMessage) -> Result<RouteOutcome, ProcessingError> {
        let started = Instant::now();
        self.metrics.record_received();

        let outcome = self.route(&msg.envelope).await;
        self.settle(&msg, &outcome, started).await?;
        Ok(outcome)
    }

    async fn settle(
        &self,
        msg: &QueuedMessage,
        outcome: &RouteOutcome,
        started: Instant,
    ) -> Result<(), ProcessingError> {
        let message_id = &msg.envelope.message_id;
        let settled = match outcome {
            RouteOutcome::Forwarded { to } => {
                debug!(message = %message_id, to = %to, "message forwarded");
                self.queue.complete(msg).await
            }
            RouteOutcome::DeadLettered(letter) => {
                warn!(
                    message = %message_id,
                    reason = %letter.reason,
                    description = %letter.description,
                    "message dead-lettered",
                );
                self.queue.dead_letter(msg, letter.clone()).await
            }
        };
        settled.map_err(|source| ProcessingError::Settle {
            message_id: message_id.clone(),
            source,
        })?;

        match outcome {
            RouteOutcome::Forwarded { .. } => self
                .metrics
                .record_forwarded(started.elapsed().as_millis() as u64),
            RouteOutcome::DeadLettered(letter) => self.metrics.record_dead_lettered(letter.reason),
        }
        Ok(())
    }

    /// Process messages until `cancel` fires or the queue closes.
    ///
    /// At most `max_concurrent` messages are in flight. A message whose routing is
    /// interrupted by cancellation is abandoned back to the queue. Loop-level errors
    /// go to `errors` and the loop keeps running.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken, errors: ErrorChannel) {
        let limit = self.config.max_concurrent.max(1);
        let permits = Arc::new(Semaphore::new(limit));
        let mut in_flight = JoinSet::new();
        info!(queue = self.queue.name(), max_concurrent = limit, "relay router started");

        loop {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.queue.receive() => res,
            };

            match received {
                Ok(Some(msg)) => {
                    let router = Arc::clone(&self);
                    let cancel = cancel.clone();
                    let errors = errors.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        if let Err(e) = router.process_or_abandon(msg, cancel).await {
                            router.report(&errors, e);
                        }
                    });
                }
                Ok(None) => {
                    info!(queue = self.queue.name(), "inbound queue closed");
                    break;
                }
                Err(e) => {
                    self.report(&errors, ProcessingError::Receive(e));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                    }
                }
            }

            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    self.report(&errors, ProcessingError::Handler(e.to_string()));
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                self.report(&errors, ProcessingError::Handler(e.to_string()));
            }
        }
        info!(queue = self.queue.name(), "relay router stopped");
    }

    async fn process_or_abandon(
        &self,
        msg: QueuedMessage,
        cancel: CancellationToken,
    ) -> Result<(), ProcessingError> {
        let started = Instant::now();
        self.metrics.record_received();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(message = %msg.envelope.message_id, "routing interrupted, abandoning message");
                return self.queue.abandon(&msg).await.map_err(|source| ProcessingError::Settle {
                    message_id: msg.envelope.message_id.clone(),
                    source,
                });
            }
            outcome = self.route(&msg.envelope) => outcome,
        };
        self.settle(&msg, &outcome, started).await
    }

    fn report(&self, errors: &ErrorChannel, err: ProcessingError) {
        self.metrics.record_processing_error(err.kind());
        error!(kind = err.kind(), error = %err, "relay processing error");
        let _ = errors.send(err);
    }
}

fn dead(reason: DeadLetterReason, description: impl Into<String>) -> RouteOutcome {
    RouteOutcome::DeadLettered(DeadLetter::new(reason, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MessageQueue;
    use crate::testing::{FakeDelivery, FakeQueue};

    use std::sync::atomic::Ordering;
    use tandem_model::PROP_SENDER_IDENTITY;
    use tokio::sync::mpsc;

    fn envelope(sender: Option<&str>, payload: &[u8]) -> RelayEnvelope {
        let env = RelayEnvelope::new(payload.to_vec());
        match sender {
            Some(s) => env.with_property(PROP_SENDER_IDENTITY, s),
            None => env,
        }
    }

    fn router(queue: &Arc<FakeQueue>, delivery: &Arc<FakeDelivery>) -> RelayRouter {
        RelayRouter::new(queue.clone(), delivery.clone())
    }

    #[tokio::test]
    async fn forwards_to_counterpart_byte_for_byte() {
        let queue = Arc::new(FakeQueue::new("device-messages"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-42"]));
        let router = router(&queue, &delivery);

        let payload = b"{\"name\":\"n\",\"bin\":[0,255]}\xff".to_vec();
        queue
            .send(envelope(Some("scheduler::job-42"), &payload))
            .await
            .unwrap();
        let msg = queue.receive().await.unwrap().unwrap();
        let id = msg.envelope.message_id.clone();

        let outcome = router.process(msg).await.unwrap();

        match outcome {
            RouteOutcome::Forwarded { to } => assert_eq!(to.to_string(), "solver::job-42"),
            other => panic!("expected Forwarded, got {other:?}"),
        }
        let delivered = delivery.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1.payload, payload);
        assert_eq!(
            delivered[0].1.properties.get(PROP_FROM_IDENTITY),
            Some("scheduler::job-42")
        );
        assert_eq!(queue.completed_ids(), vec![id]);
        assert!(queue.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn missing_identity_is_dead_lettered_without_delivery() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-42"]));
        let router = router(&queue, &delivery);

        for sender in [None, Some("scheduler-job-42"), Some("worker::job-42")] {
            let outcome = router.route(&envelope(sender, b"x")).await;
            match outcome {
                RouteOutcome::DeadLettered(letter) => {
                    assert_eq!(letter.reason, DeadLetterReason::IdentityMissing, "{sender:?}")
                }
                other => panic!("expected IdentityMissing for {sender:?}, got {other:?}"),
            }
        }
        assert!(delivery.delivered().is_empty());
    }

    #[tokio::test]
    async fn unknown_counterpart_is_dead_lettered_not_completed() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::default());
        let router = router(&queue, &delivery);

        queue
            .send(envelope(Some("solver::job-7"), b"x"))
            .await
            .unwrap();
        let msg = queue.receive().await.unwrap().unwrap();
        router.process(msg).await.unwrap();

        assert!(queue.completed_ids().is_empty());
        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].1.reason, DeadLetterReason::CounterpartNotFound);
        assert!(dead[0].1.description.contains("scheduler::job-7"));
    }

    #[tokio::test]
    async fn other_failures_are_delivery_failed_with_description() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-1"]));
        *delivery.failure.lock().unwrap() = Some("throttled".into());
        let router = router(&queue, &delivery);

        match router.route(&envelope(Some("scheduler::job-1"), b"x")).await {
            RouteOutcome::DeadLettered(letter) => {
                assert_eq!(letter.reason, DeadLetterReason::DeliveryFailed);
                assert!(letter.description.contains("throttled"));
            }
            other => panic!("expected DeliveryFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn validation_dead_letters_malformed_payloads() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-1"]));
        let router = router(&queue, &delivery).with_config(RouterConfig {
            validate_payloads: true,
            ..Default::default()
        });

        let bad = br#"{"name":"n","correlationId":"job-1","step":"A","status":"Paused"}"#;
        match router.route(&envelope(Some("scheduler::job-1"), bad)).await {
            RouteOutcome::DeadLettered(letter) => {
                assert_eq!(letter.reason, DeadLetterReason::SerializationError)
            }
            other => panic!("expected SerializationError, got {other:?}"),
        }

        let good = br#"{"name":"n","correlationId":"job-1","step":"A","status":"Completed"}"#;
        assert!(matches!(
            router.route(&envelope(Some("scheduler::job-1"), good)).await,
            RouteOutcome::Forwarded { .. }
        ));
    }

    #[tokio::test]
    async fn run_keeps_going_after_loop_errors() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-1"]));
        queue.receive_failures.store(1, Ordering::SeqCst);
        let router = Arc::new(router(&queue, &delivery));

        queue
            .send(envelope(Some("scheduler::job-1"), b"a"))
            .await
            .unwrap();
        queue.send(envelope(None, b"b")).await.unwrap();
        queue.close();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.run(CancellationToken::new(), tx).await;

        match rx.try_recv() {
            Ok(ProcessingError::Receive(_)) => {}
            other => panic!("expected a reported receive error, got {other:?}"),
        }
        assert_eq!(queue.completed_ids().len(), 1);
        assert_eq!(queue.dead_letters().len(), 1);
    }

    #[tokio::test]
    async fn settle_failures_are_reported() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-1"]));
        queue.fail_settle.store(true, Ordering::SeqCst);
        let router = Arc::new(router(&queue, &delivery));

        queue
            .send(envelope(Some("scheduler::job-1"), b"a"))
            .await
            .unwrap();
        queue.close();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.run(CancellationToken::new(), tx).await;

        match rx.try_recv() {
            Ok(ProcessingError::Settle { message_id, .. }) => assert!(!message_id.is_empty()),
            other => panic!("expected a settle error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_config() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-1"]));
        *delivery.delay.lock().unwrap() = Some(Duration::from_millis(20));

        for _ in 0..6 {
            queue
                .send(envelope(Some("scheduler::job-1"), b"x"))
                .await
                .unwrap();
        }
        queue.close();

        let router = Arc::new(router(&queue, &delivery).with_config(RouterConfig {
            max_concurrent: 2,
            ..Default::default()
        }));
        let (tx, _rx) = mpsc::unbounded_channel();
        router.run(CancellationToken::new(), tx).await;

        assert_eq!(queue.completed_ids().len(), 6);
        assert!(delivery.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn default_is_serial() {
        assert_eq!(RouterConfig::default().max_concurrent, 1);
    }

    #[tokio::test]
    async fn cancellation_abandons_in_flight_message() {
        let queue = Arc::new(FakeQueue::new("q"));
        let delivery = Arc::new(FakeDelivery::with_registered(&["solver::job-1"]));
        *delivery.delay.lock().unwrap() = Some(Duration::from_secs(30));
        queue
            .send(envelope(Some("scheduler::job-1"), b"x"))
            .await
            .unwrap();

        let router = Arc::new(router(&queue, &delivery));
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(router.run(cancel.clone(), tx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("router must stop promptly")
            .unwrap();

        assert_eq!(queue.abandoned.lock().unwrap().len(), 1);
        assert!(queue.completed_ids().is_empty());
        assert!(queue.dead_letters().is_empty());
    }
}
