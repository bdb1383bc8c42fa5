use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Control message addressed to a running solver.
///
/// Wire shape: `{"command": "setStepDelay", "seconds": 3}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum RunnerCommand {
    /// Replace the simulated per-step work duration for the following steps.
    SetStepDelay { seconds: u64 },
}

impl RunnerCommand {
    pub fn step_delay(&self) -> Option<Duration> {
        match self {
            RunnerCommand::SetStepDelay { seconds } => Some(Duration::from_secs(*seconds)),
        }
    }
}
