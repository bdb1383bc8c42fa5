//! Prometheus backend for [`tandem_core::metrics::RelayMetrics`].
//!
//! ## Metrics
//! - `tandem_relay_messages_received_total` - Counter
//! - `tandem_relay_messages_forwarded_total` - Counter
//! - `tandem_relay_forward_duration_seconds` - Histogram
//! - `tandem_relay_dead_letters_total{reason}` - Counter
//! - `tandem_relay_processing_errors_total{kind}` - Counter
//! - `tandem_jobs_finished_total{role, outcome}` - Counter
//!
//! The crate serves no HTTP itself; [`PrometheusMetrics::render`] produces the text
//! exposition for whatever server the binary runs.
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
