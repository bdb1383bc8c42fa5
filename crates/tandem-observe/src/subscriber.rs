//! Taskvisor event subscriber writing supervisor lifecycle events to the log.
use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

const QUEUE_CAPACITY: usize = 1024;

/// Logs supervisor events of the relay services.
#[derive(Debug, Default)]
pub struct EventLogger;

#[async_trait]
impl Subscribe for EventLogger {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "event-logger"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("unknown");
    let reason = e.reason.as_deref().unwrap_or("none");
    let attempt = e.attempt.unwrap_or(0);

    match e.kind {
        EventKind::TaskStarting => info!(task, attempt, "service starting"),
        EventKind::TaskStopped => debug!(task, "service stopped"),
        EventKind::TaskFailed => error!(task, attempt, reason, "service attempt failed"),
        EventKind::TimeoutHit => warn!(
            task,
            timeout_ms = e.timeout_ms.unwrap_or(0),
            "service attempt timed out"
        ),
        EventKind::BackoffScheduled => debug!(
            task,
            attempt,
            delay_ms = e.delay_ms.unwrap_or(0),
            reason,
            "service restart scheduled"
        ),
        EventKind::ActorExhausted => warn!(task, reason, "service will not be restarted"),
        EventKind::ActorDead => error!(task, reason, "service terminated permanently"),
        EventKind::ShutdownRequested => info!("shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("all services stopped within grace period"),
        EventKind::GraceExceeded => warn!("grace period exceeded, some services did not stop"),
        EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
            error!(task, reason, kind = ?e.kind, "event subscriber failure")
        }
        _ => trace!(task, kind = ?e.kind, "supervisor event"),
    }
}
