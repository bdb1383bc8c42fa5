use tandem_model::{Identity, Job, JobStatus, PROP_SENDER_IDENTITY, RelayEnvelope};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::queue::QueueHandle;
use crate::runner::inbound::{Signal, classify};
use crate::runner::ledger::{Observation, StepLedger};
use crate::runner::{JobState, JobStateMachine, RunnerError};
use crate::transport::{Subscription, TransportHandle};

/// Publishes a job and follows its progress until every step completed or the job was cancelled.
pub struct SchedulerRunner {
    transport: TransportHandle,
    jobs: QueueHandle,
}

impl SchedulerRunner {
    /// `jobs` is the work queue solvers pick jobs from; `transport` carries the updates.
    pub fn new(transport: TransportHandle, jobs: QueueHandle) -> Self {
        Self { transport, jobs }
    }

    /// Publish `job` and wait for its outcome.
    ///
    /// The update subscription is opened before the job is published, so no update
    /// can be missed. Cancelling `cancel` sends one `Cancelled` notice to the solver.
    #[instrument(level = "debug", skip(self, job, cancel), fields(job = %job.correlation_id))]
    pub async fn run(&self, job: &Job, cancel: CancellationToken) -> Result<JobState, RunnerError> {
        job.validate()?;

        let me = job.scheduler_identity();
        let mut sm = JobStateMachine::new();

        let mut sub = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                sm.transition(JobState::Cancelled)?;
                return Ok(JobState::Cancelled);
            }
            sub = self.transport.subscribe(&me) => sub?,
        };

        let result = self.drive(job, &me, &mut sm, &mut sub, &cancel).await;

        sub.close();
        if let Err(e) = self.transport.release(&me).await {
            warn!(error = %e, "failed to release scheduler identity");
        }
        match &result {
            Ok(state) => info!(state = %state, "scheduler run finished"),
            Err(e) => error!(error = %e, "scheduler run failed"),
        }
        result
    }

    async fn drive(
        &self,
        job: &Job,
        me: &Identity,
        sm: &mut JobStateMachine,
        sub: &mut Subscription,
        cancel: &CancellationToken,
    ) -> Result<JobState, RunnerError> {
        sm.transition(JobState::Publishing)?;
        let envelope =
            RelayEnvelope::new(job.to_vec()?).with_property(PROP_SENDER_IDENTITY, me.to_string());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                sm.transition(JobState::Cancelled)?;
                return Ok(JobState::Cancelled);
            }
            sent = self.jobs.send(envelope) => sent?,
        }
        sm.transition(JobState::AwaitingUpdates)?;
        info!(queue = self.jobs.name(), steps = job.steps.len(), "job published");

        let mut ledger = StepLedger::new(job);
        if ledger.is_complete() {
            sm.transition(JobState::Done)?;
            return Ok(JobState::Done);
        }

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.notify_cancelled(job, me, &ledger).await;
                    sm.transition(JobState::Cancelled)?;
                    return Ok(JobState::Cancelled);
                }
                msg = sub.recv() => msg,
            };
            let Some(msg) = msg else {
                return Err(RunnerError::ChannelClosed);
            };

            let update = match classify(job, me, msg) {
                Signal::Cancel => {
                    info!("job cancelled by solver");
                    sm.observe(JobState::Cancelled)?;
                    return Ok(JobState::Cancelled);
                }
                Signal::Update(update) => update,
                Signal::Command(_) | Signal::Ignore => continue,
            };

            let index = match ledger.observe(&update.step, update.status) {
                Observation::Recorded { index } => index,
                Observation::Regressed { index, previous } => {
                    warn!(
                        step = %update.step,
                        index,
                        previous = %previous,
                        status = %update.status,
                        "out-of-order update ignored",
                    );
                    continue;
                }
                Observation::UnknownStep => {
                    warn!(step = %update.step, "update for unknown step ignored");
                    continue;
                }
            };
            debug!(step = %update.step, index, status = %update.status, "update received");

            let observed = match update.status {
                JobStatus::InProgress => JobState::StepInProgress { step: index },
                JobStatus::Completed => JobState::StepCompleted { step: index },
                JobStatus::Cancelled => JobState::Cancelled,
            };
            sm.observe(observed)?;

            if ledger.is_complete() {
                sm.observe(JobState::Done)?;
                return Ok(JobState::Done);
            }
        }
    }

    async fn notify_cancelled(&self, job: &Job, me: &Identity, ledger: &StepLedger) {
        let step = ledger
            .current_step()
            .or_else(|| job.steps.first().map(String::as_str))
            .unwrap_or_default();
        info!(step, "run cancelled locally, notifying solver");

        let payload = match job.update(step, JobStatus::Cancelled).to_vec() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to encode cancellation notice");
                return;
            }
        };
        if let Err(e) = self
            .transport
            .publish_to(me, &me.counterpart(), payload)
            .await
        {
            warn!(error = %e, "failed to send cancellation notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MessageQueue;
    use crate::runner::{RunnerConfig, SolverRunner};
    use crate::testing::{FakeQueue, LoopbackTransport};

    use std::sync::Arc;
    use std::time::Duration;
    use tandem_model::{CorrelationId, JobUpdate, ModelError};

    fn job(steps: &[&str]) -> Job {
        Job::new("render", CorrelationId::new("job-7").unwrap(), steps.iter().copied())
    }

    async fn wait_subscribed(transport: &LoopbackTransport, id: &Identity) {
        for _ in 0..200 {
            if transport.is_subscribed(id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("{id} never subscribed");
    }

    fn send(transport: &LoopbackTransport, job: &Job, step: &str, status: JobStatus) {
        let payload = job.update(step, status).to_vec().unwrap();
        assert!(transport.inject(
            &job.solver_identity().to_string(),
            &job.scheduler_identity(),
            payload
        ));
    }

    #[tokio::test]
    async fn publishes_job_then_completes_on_out_of_order_updates() {
        let transport = Arc::new(LoopbackTransport::default());
        let jobs = Arc::new(FakeQueue::new("jobs"));
        let runner = SchedulerRunner::new(transport.clone(), jobs.clone());
        let job = job(&["A", "B"]);

        let handle = {
            let job = job.clone();
            tokio::spawn(async move { runner.run(&job, CancellationToken::new()).await })
        };
        wait_subscribed(&transport, &job.scheduler_identity()).await;

        send(&transport, &job, "B", JobStatus::Completed);
        send(&transport, &job, "A", JobStatus::InProgress);
        send(&transport, &job, "B", JobStatus::InProgress);
        send(&transport, &job, "A", JobStatus::Completed);

        let state = handle.await.unwrap().unwrap();
        assert_eq!(state, JobState::Done);

        let published = jobs.receive().await.unwrap().unwrap();
        assert_eq!(Job::from_slice(&published.envelope.payload).unwrap(), job);
        assert_eq!(
            published.envelope.sender_identity(),
            Some("scheduler::job-7")
        );
    }

    #[tokio::test]
    async fn stops_when_solver_cancels() {
        let transport = Arc::new(LoopbackTransport::default());
        let runner = SchedulerRunner::new(transport.clone(), Arc::new(FakeQueue::new("jobs")));
        let job = job(&["A", "B"]);

        let handle = {
            let job = job.clone();
            tokio::spawn(async move { runner.run(&job, CancellationToken::new()).await })
        };
        wait_subscribed(&transport, &job.scheduler_identity()).await;
        send(&transport, &job, "A", JobStatus::InProgress);
        send(&transport, &job, "A", JobStatus::Cancelled);

        assert_eq!(handle.await.unwrap().unwrap(), JobState::Cancelled);
        assert!(transport.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_cancellation_notifies_solver() {
        let transport = Arc::new(LoopbackTransport::default());
        let runner = SchedulerRunner::new(transport.clone(), Arc::new(FakeQueue::new("jobs")));
        let job = job(&["A", "B"]);
        let cancel = CancellationToken::new();

        let handle = {
            let job = job.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { runner.run(&job, cancel).await })
        };
        wait_subscribed(&transport, &job.scheduler_identity()).await;
        send(&transport, &job, "A", JobStatus::InProgress);
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap().unwrap(), JobState::Cancelled);
        let notices: Vec<JobUpdate> = transport.updates_from(&job.scheduler_identity());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].step, "A");
        assert_eq!(notices[0].status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn rejects_invalid_job_before_publishing() {
        let transport = Arc::new(LoopbackTransport::default());
        let runner = SchedulerRunner::new(transport.clone(), Arc::new(FakeQueue::new("jobs")));

        match runner.run(&job(&["A", " "]), CancellationToken::new()).await {
            Err(RunnerError::InvalidJob(ModelError::InvalidJob(_))) => {}
            other => panic!("expected InvalidJob, got {other:?}"),
        }
        assert!(transport.released.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pairs_with_solver_over_loopback() {
        let transport = Arc::new(LoopbackTransport::default());
        let jobs = Arc::new(FakeQueue::new("jobs"));
        let scheduler = SchedulerRunner::new(transport.clone(), jobs.clone());
        let solver = SolverRunner::new(transport.clone())
            .with_config(RunnerConfig::default().with_step_delay(Duration::from_millis(5)));
        let job = job(&["A", "B", "C"]);

        let sched = {
            let job = job.clone();
            tokio::spawn(async move { scheduler.run(&job, CancellationToken::new()).await })
        };
        let msg = jobs.receive().await.unwrap().unwrap();
        let received = Job::from_slice(&msg.envelope.payload).unwrap();

        let solved = solver.run(&received, CancellationToken::new()).await.unwrap();
        assert_eq!(solved, JobState::Done);
        assert_eq!(sched.await.unwrap().unwrap(), JobState::Done);
    }
}
