use std::sync::Arc;

use tandem_model::DeadLetterReason;

/// Terminal outcome of a job run, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Cancelled,
    Failed,
}

impl JobOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            JobOutcome::Done => "done",
            JobOutcome::Cancelled => "cancelled",
            JobOutcome::Failed => "failed",
        }
    }
}

/// Relay metrics collection interface.
///
/// Implementations are injected into the router and the solver worker.
pub trait RelayMetrics: Send + Sync + 'static {
    /// Record a message taken from the inbound queue.
    fn record_received(&self);

    /// Record a forwarded message.
    ///
    /// # Arguments
    /// - `duration_ms`: Time from receipt to settled forward
    fn record_forwarded(&self, duration_ms: u64);

    /// Record a dead-lettered message by reason.
    fn record_dead_lettered(&self, reason: DeadLetterReason);

    /// Record a processing-loop error that is not tied to one message.
    ///
    /// # Arguments
    /// - `kind`: Error category
    fn record_processing_error(&self, kind: &str);

    /// Record a job run reaching a terminal state.
    ///
    /// # Arguments
    /// - `role`: `scheduler` or `solver`
    /// - `outcome`: How the run ended
    fn record_job_finished(&self, role: &str, outcome: JobOutcome);
}

/// Shared handle to a metrics backend.
pub type MetricsHandle = Arc<dyn RelayMetrics>;
