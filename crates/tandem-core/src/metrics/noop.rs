use tandem_model::DeadLetterReason;

use crate::metrics::backend::{JobOutcome, RelayMetrics};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl RelayMetrics for NoOpMetrics {
    #[inline(always)]
    fn record_received(&self) {}

    #[inline(always)]
    fn record_forwarded(&self, _: u64) {}

    #[inline(always)]
    fn record_dead_lettered(&self, _: DeadLetterReason) {}

    #[inline(always)]
    fn record_processing_error(&self, _: &str) {}

    #[inline(always)]
    fn record_job_finished(&self, _: &str, _: JobOutcome) {}
}
