use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// The half of a pairing an identity represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits a job and observes its updates.
    Scheduler,
    /// Executes the job steps.
    Solver,
}

impl Role {
    /// Returns the role tag used on the wire.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Scheduler => "scheduler",
            Role::Solver => "solver",
        }
    }

    /// Returns the other half of the pairing.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Role::Scheduler => Role::Solver,
            Role::Solver => Role::Scheduler,
        }
    }
}

impl FromStr for Role {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "scheduler" => Ok(Role::Scheduler),
            "solver" => Ok(Role::Solver),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
