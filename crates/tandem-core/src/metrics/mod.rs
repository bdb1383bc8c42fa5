//! Metrics collection abstraction for the relay and the job runners.
//!
//! Backends (prometheus, ...) implement [`RelayMetrics`]; the default is [`NoOpMetrics`].
mod backend;
pub use backend::{JobOutcome, MetricsHandle, RelayMetrics};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
