use std::fmt;

use crate::runner::RunnerError;

/// Lifecycle of one job on either side.
///
/// `Created -> Publishing -> AwaitingUpdates -> (StepInProgress <-> StepCompleted)* -> Done | Cancelled`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Created,
    Publishing,
    AwaitingUpdates,
    StepInProgress { step: usize },
    StepCompleted { step: usize },
    Done,
    Cancelled,
}

impl JobState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Created => f.write_str("created"),
            JobState::Publishing => f.write_str("publishing"),
            JobState::AwaitingUpdates => f.write_str("awaiting-updates"),
            JobState::StepInProgress { step } => write!(f, "step-in-progress({step})"),
            JobState::StepCompleted { step } => write!(f, "step-completed({step})"),
            JobState::Done => f.write_str("done"),
            JobState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Guards the legal transitions of [`JobState`].
///
/// The acting side uses [`JobStateMachine::transition`] (strict step order). The
/// observing side uses [`JobStateMachine::observe`], which tolerates out-of-order
/// step updates. Both refuse to leave a terminal state.
#[derive(Debug)]
pub struct JobStateMachine {
    state: JobState,
}

impl Default for JobStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStateMachine {
    pub fn new() -> Self {
        Self {
            state: JobState::Created,
        }
    }

    #[inline]
    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn can_transition(&self, to: JobState) -> bool {
        use JobState::*;

        match (self.state, to) {
            (from, _) if from.is_terminal() => false,
            (_, Cancelled) => true,
            (Created, Publishing) | (Created, AwaitingUpdates) | (Publishing, AwaitingUpdates) => {
                true
            }
            (AwaitingUpdates, StepInProgress { step }) => step == 0,
            (StepInProgress { step: a }, StepCompleted { step: b }) => a == b,
            (StepCompleted { step: a }, StepInProgress { step: b }) => b == a + 1,
            (AwaitingUpdates, Done) | (StepCompleted { .. }, Done) => true,
            _ => false,
        }
    }

    pub fn transition(&mut self, to: JobState) -> Result<(), RunnerError> {
        if !self.can_transition(to) {
            return Err(RunnerError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Record the latest observed state without enforcing step order.
    ///
    /// Only valid once updates are awaited.
    pub fn observe(&mut self, to: JobState) -> Result<(), RunnerError> {
        let awaiting = matches!(
            self.state,
            JobState::AwaitingUpdates | JobState::StepInProgress { .. } | JobState::StepCompleted { .. }
        );
        let observable = matches!(
            to,
            JobState::StepInProgress { .. }
                | JobState::StepCompleted { .. }
                | JobState::Done
                | JobState::Cancelled
        );
        if !awaiting || !observable {
            return Err(RunnerError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
