use std::sync::Arc;

use tandem_model::{Identity, Job, JobStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::runner::inbound::{Signal, classify};
use crate::runner::{JobState, JobStateMachine, RunnerConfig, RunnerError, SimulatedWork, StepWork};
use crate::transport::{Inbound, Subscription, TransportHandle};

/// Executes the steps of one job and reports every step transition to the scheduler.
pub struct SolverRunner {
    transport: TransportHandle,
    work: Arc<dyn StepWork>,
    config: RunnerConfig,
}

#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Cancel,
}

/// Borrowed context of one run.
struct Run<'a> {
    job: &'a Job,
    me: Identity,
    peer: Identity,
    sm: JobStateMachine,
    config: RunnerConfig,
}

impl SolverRunner {
    pub fn new(transport: TransportHandle) -> Self {
        Self {
            transport,
            work: Arc::new(SimulatedWork),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_work(mut self, work: Arc<dyn StepWork>) -> Self {
        self.work = work;
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `job` to a terminal state.
    ///
    /// Returns [`JobState::Done`] or [`JobState::Cancelled`]. A peer cancellation stops
    /// the run without emitting anything further; a local cancellation sends one
    /// `Cancelled` notice to the scheduler first. The subscription is torn down in
    /// every case.
    #[instrument(level = "debug", skip(self, job, cancel), fields(job = %job.correlation_id))]
    pub async fn run(&self, job: &Job, cancel: CancellationToken) -> Result<JobState, RunnerError> {
        let mut run = Run {
            job,
            me: job.solver_identity(),
            peer: job.scheduler_identity(),
            sm: JobStateMachine::new(),
            config: self.config.clone(),
        };

        let mut sub = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                run.sm.transition(JobState::Cancelled)?;
                return Ok(JobState::Cancelled);
            }
            sub = self.transport.subscribe(&run.me) => sub?,
        };
        run.sm.transition(JobState::AwaitingUpdates)?;
        info!(transport = self.transport.name(), steps = job.steps.len(), "solver run started");

        let result = self.drive(&mut run, &mut sub, &cancel).await;

        sub.close();
        if let Err(e) = self.transport.release(&run.me).await {
            warn!(error = %e, "failed to release solver identity");
        }
        match &result {
            Ok(state) => info!(state = %state, "solver run finished"),
            Err(e) => error!(error = %e, "solver run failed"),
        }
        result
    }

    async fn drive(
        &self,
        run: &mut Run<'_>,
        sub: &mut Subscription,
        cancel: &CancellationToken,
    ) -> Result<JobState, RunnerError> {
        let job = run.job;
        let mut inbound_open = true;

        for (index, step) in job.steps.iter().enumerate() {
            while let Some(msg) = sub.try_recv() {
                if self.apply(run, msg) == Control::Cancel {
                    return cancelled_by_peer(run, step);
                }
            }
            if cancel.is_cancelled() {
                return self.cancel_locally(run, step).await;
            }

            run.sm.transition(JobState::StepInProgress { step: index })?;
            self.emit(run, step, JobStatus::InProgress).await?;

            let step_config = run.config.clone();
            let mut work = self.work.perform(job, step, &step_config);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return self.cancel_locally(run, step).await,
                    msg = sub.recv(), if inbound_open => match msg {
                        Some(msg) => {
                            if self.apply(run, msg) == Control::Cancel {
                                return cancelled_by_peer(run, step);
                            }
                        }
                        None => {
                            warn!("update channel closed; peer cancellation can no longer be observed");
                            inbound_open = false;
                        }
                    },
                    _ = &mut work => break,
                }
            }

            run.sm.transition(JobState::StepCompleted { step: index })?;
            self.emit(run, step, JobStatus::Completed).await?;
        }

        run.sm.transition(JobState::Done)?;
        Ok(JobState::Done)
    }

    fn apply(&self, run: &mut Run<'_>, msg: Inbound) -> Control {
        match classify(run.job, &run.me, msg) {
            Signal::Cancel => Control::Cancel,
            Signal::Command(cmd) => {
                run.config.apply(&cmd);
                info!(
                    step_delay_ms = run.config.step_delay.as_millis() as u64,
                    "runner command applied",
                );
                Control::Continue
            }
            Signal::Update(update) => {
                debug!(step = %update.step, status = %update.status, "ignoring peer update");
                Control::Continue
            }
            Signal::Ignore => Control::Continue,
        }
    }

    async fn emit(&self, run: &Run<'_>, step: &str, status: JobStatus) -> Result<(), RunnerError> {
        let payload = run.job.update(step, status).to_vec()?;
        self.transport.publish_to(&run.me, &run.peer, payload).await?;
        debug!(step, status = %status, "update emitted");
        Ok(())
    }

    async fn cancel_locally(&self, run: &mut Run<'_>, step: &str) -> Result<JobState, RunnerError> {
        info!(step, "run cancelled locally, notifying scheduler");
        if let Err(e) = self.emit(run, step, JobStatus::Cancelled).await {
            warn!(error = %e, "failed to send cancellation notice");
        }
        run.sm.transition(JobState::Cancelled)?;
        Ok(JobState::Cancelled)
    }
}

fn cancelled_by_peer(run: &mut Run<'_>, step: &str) -> Result<JobState, RunnerError> {
    info!(step, "job cancelled by scheduler");
    run.sm.transition(JobState::Cancelled)?;
    Ok(JobState::Cancelled)
}
