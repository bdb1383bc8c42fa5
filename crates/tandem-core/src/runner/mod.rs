//! Job runners for both halves of a job.
//!
//! [`SchedulerRunner`] publishes a job and follows its updates; [`SolverRunner`]
//! executes the steps and reports them. Both sides track their progress in a
//! [`JobStateMachine`] and stop at the first cancellation from either side.
mod config;
pub use config::{DEFAULT_STEP_DELAY, RunnerConfig};

mod error;
pub use error::RunnerError;

mod state;
pub use state::{JobState, JobStateMachine};

mod work;
pub use work::{SimulatedWork, StepWork};

mod scheduler;
pub use scheduler::SchedulerRunner;

mod solver;
pub use solver::SolverRunner;

mod worker;
pub use worker::SolverWorker;

pub(crate) mod inbound;
mod ledger;
