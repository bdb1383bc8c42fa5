//! Supervised services of the relay daemon.
//!
//! Each long-running loop (relay router, solver worker) is wrapped into a taskvisor
//! task so the supervisor owns its cancellation and restarts.
mod map;
pub use map::{to_backoff_policy, to_jitter_policy, to_restart_policy, to_task_spec};

mod policy;
pub use policy::ServicePolicy;

use std::sync::Arc;

use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::router::{ErrorChannel, RelayRouter};
use crate::runner::SolverWorker;

/// Name of the relay router task.
pub const RELAY_SERVICE_NAME: &str = "tandem-relay-router";

/// Name of the embedded solver worker task.
pub const SOLVER_SERVICE_NAME: &str = "tandem-solver-worker";

/// Wrap the router loop into a task.
///
/// Per-message failures go to `errors` and never stop the loop; the task ends when the
/// queue closes or the supervisor cancels it.
pub fn relay_service(router: Arc<RelayRouter>, errors: ErrorChannel) -> TaskRef {
    TaskFn::arc(RELAY_SERVICE_NAME, move |ctx: CancellationToken| {
        let router = Arc::clone(&router);
        let errors = errors.clone();

        async move {
            debug!("relay router task started");
            router.run(ctx.clone(), errors).await;
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            Ok(())
        }
    })
}

/// Wrap the solver worker into a task. Queue failures fail the attempt so the
/// supervisor can restart it.
pub fn solver_worker_service(worker: Arc<SolverWorker>) -> TaskRef {
    TaskFn::arc(SOLVER_SERVICE_NAME, move |ctx: CancellationToken| {
        let worker = Arc::clone(&worker);

        async move {
            debug!("solver worker task started");
            match worker.run(ctx.clone()).await {
                Ok(()) if ctx.is_cancelled() => Err(TaskError::Canceled),
                Ok(()) => Ok(()),
                Err(e) => Err(TaskError::Fail {
                    reason: format!("solver worker failed: {e}"),
                }),
            }
        }
    })
}
