use tandem_model::{BackoffStrategy, JitterStrategy, RestartStrategy};

/// Supervision policy for one long-running relay service.
#[derive(Clone, Debug)]
pub struct ServicePolicy {
    pub restart: RestartStrategy,
    pub backoff: BackoffStrategy,
    /// Upper bound for one attempt; `None` lets the service run until cancelled.
    pub timeout_ms: Option<u64>,
}

impl Default for ServicePolicy {
    /// Restart on failure with capped exponential backoff and no attempt timeout.
    fn default() -> Self {
        Self {
            restart: RestartStrategy::OnFailure,
            backoff: BackoffStrategy {
                jitter: JitterStrategy::Equal,
                delay_ms: None,
                first_ms: 500,
                max_ms: 30_000,
                factor: 2.0,
            },
            timeout_ms: None,
        }
    }
}

impl ServicePolicy {
    pub fn new(restart: RestartStrategy, backoff: BackoffStrategy, timeout_ms: Option<u64>) -> Self {
        Self {
            restart,
            backoff,
            timeout_ms,
        }
    }
}
