use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// When a long-running relay service is started again after it returned.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestartStrategy {
    Never,
    /// Restart whatever the exit reason.
    Always,
    #[default]
    OnFailure,
}

impl FromStr for RestartStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(RestartStrategy::Always),
            "never" => Ok(RestartStrategy::Never),
            "on-failure" | "failure" | "" => Ok(RestartStrategy::OnFailure),
            other => Err(ModelError::UnknownRestart(other.to_string())),
        }
    }
}
