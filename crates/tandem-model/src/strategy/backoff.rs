use serde::{Deserialize, Serialize};

use crate::strategy::JitterStrategy;

/// Exponential restart backoff: `first_ms * factor^n`, capped at `max_ms`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffStrategy {
    pub jitter: JitterStrategy,
    /// Pause before restarting after a successful exit.
    #[serde(default)]
    pub delay_ms: Option<u64>,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            jitter: JitterStrategy::Full,
            delay_ms: None,
            first_ms: 500,
            max_ms: 30_000,
            factor: 2.0,
        }
    }
}
