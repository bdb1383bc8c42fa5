use async_trait::async_trait;
use tandem_model::Job;
use tracing::trace;

use crate::runner::RunnerConfig;

/// The work behind one step. Opaque to the runner; dropped on cancellation.
#[async_trait]
pub trait StepWork: Send + Sync + 'static {
    async fn perform(&self, job: &Job, step: &str, config: &RunnerConfig);
}

/// Step work modeled as a delay of [`RunnerConfig::step_delay`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedWork;

#[async_trait]
impl StepWork for SimulatedWork {
    async fn perform(&self, job: &Job, step: &str, config: &RunnerConfig) {
        trace!(
            job = %job.correlation_id,
            step,
            delay_ms = config.step_delay.as_millis() as u64,
            "simulating step work",
        );
        tokio::time::sleep(config.step_delay).await;
    }
}
