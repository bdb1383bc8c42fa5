use std::sync::Arc;

use tandem_model::{DeadLetter, DeadLetterReason, Job};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::{JobOutcome, MetricsHandle, noop_metrics};
use crate::queue::{QueueHandle, QueuedMessage};
use crate::runner::{JobState, RunnerError, SolverRunner};

/// Takes jobs off the work queue and runs each one on its own task.
pub struct SolverWorker {
    jobs: QueueHandle,
    runner: Arc<SolverRunner>,
    metrics: MetricsHandle,
}

impl SolverWorker {
    pub fn new(jobs: QueueHandle, runner: Arc<SolverRunner>) -> Self {
        Self {
            jobs,
            runner,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Consume jobs until `cancel` fires or the queue closes.
    ///
    /// Running jobs receive a child token, so stopping the worker cancels them; the
    /// worker returns only after every run finished.
    #[instrument(level = "debug", skip(self, cancel), fields(queue = self.jobs.name()))]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<(), RunnerError> {
        let mut running = JoinSet::new();
        info!("solver worker started");

        let result = loop {
            while let Some(joined) = running.try_join_next() {
                self.reap(joined);
            }

            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                received = self.jobs.receive() => received,
            };
            let msg = match received {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    info!("job queue closed");
                    break Ok(());
                }
                Err(e) => {
                    error!(error = %e, "job queue receive failed");
                    self.metrics.record_processing_error("receive");
                    break Err(RunnerError::Queue(e));
                }
            };

            if let Some(job) = self.accept(&msg).await {
                let worker = Arc::clone(&self);
                let token = cancel.child_token();
                running.spawn(async move { worker.execute(job, token).await });
            }
        };

        if !running.is_empty() {
            debug!(running = running.len(), "waiting for running jobs");
        }
        while let Some(joined) = running.join_next().await {
            self.reap(joined);
        }
        info!("solver worker stopped");
        result
    }

    /// Account for a run whose task panicked or was aborted.
    fn reap(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            error!(error = %e, "solver run aborted");
            self.metrics.record_processing_error("handler");
            self.metrics.record_job_finished("solver", JobOutcome::Failed);
        }
    }

    /// Settle the queue message and return the job to run, if it is one.
    async fn accept(&self, msg: &QueuedMessage) -> Option<Job> {
        self.metrics.record_received();
        match Job::from_slice(&msg.envelope.payload) {
            Ok(job) => {
                if let Err(e) = self.jobs.complete(msg).await {
                    warn!(message_id = %msg.envelope.message_id, error = %e, "failed to complete job message");
                    self.metrics.record_processing_error("settle");
                    return None;
                }
                Some(job)
            }
            Err(e) => {
                warn!(message_id = %msg.envelope.message_id, error = %e, "rejecting malformed job");
                let letter = DeadLetter::new(DeadLetterReason::SerializationError, e.to_string());
                self.metrics.record_dead_lettered(letter.reason);
                if let Err(e) = self.jobs.dead_letter(msg, letter).await {
                    warn!(message_id = %msg.envelope.message_id, error = %e, "failed to dead-letter job message");
                    self.metrics.record_processing_error("settle");
                }
                None
            }
        }
    }

    async fn execute(&self, job: Job, cancel: CancellationToken) {
        let outcome = match self.runner.run(&job, cancel).await {
            Ok(JobState::Done) => JobOutcome::Done,
            Ok(JobState::Cancelled) => JobOutcome::Cancelled,
            Ok(other) => {
                warn!(job = %job.correlation_id, state = %other, "run ended in a non-terminal state");
                JobOutcome::Failed
            }
            Err(_) => JobOutcome::Failed,
        };
        self.metrics.record_job_finished("solver", outcome);
    }
}
