use std::time::Duration;

use tandem_model::RunnerCommand;

/// Default simulated duration of one step.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(6);

/// Per-run solver settings. Changed at runtime only through [`RunnerCommand`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    pub step_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}

impl RunnerConfig {
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn apply(&mut self, cmd: &RunnerCommand) {
        if let Some(delay) = cmd.step_delay() {
            self.step_delay = delay;
        }
    }
}
