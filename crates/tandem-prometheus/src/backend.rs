use std::sync::Arc;

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};
use tandem_core::metrics::{JobOutcome, RelayMetrics};
use tandem_model::DeadLetterReason;

const NAMESPACE: &str = "tandem";

/// Relay metrics registered in a prometheus [`Registry`].
///
/// Every label is low cardinality: `reason` is a dead-letter reason, `kind` a
/// processing error category, `role` is `scheduler` or `solver`.
#[derive(Clone)]
pub struct PrometheusMetrics {
    received: Counter,
    forwarded: Counter,
    forward_duration: Histogram,
    dead_letters: CounterVec,
    processing_errors: CounterVec,
    jobs_finished: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let received = Counter::with_opts(
            Opts::new("relay_messages_received_total", "Messages taken from the inbound queue")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(received.clone()))?;

        let forwarded = Counter::with_opts(
            Opts::new("relay_messages_forwarded_total", "Messages forwarded to a counterpart")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(forwarded.clone()))?;

        let forward_duration = Histogram::with_opts(
            HistogramOpts::new(
                "relay_forward_duration_seconds",
                "Time from receipt to settled forward",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(forward_duration.clone()))?;

        let dead_letters = CounterVec::new(
            Opts::new("relay_dead_letters_total", "Dead-lettered messages by reason")
                .namespace(NAMESPACE),
            &["reason"],
        )?;
        registry.register(Box::new(dead_letters.clone()))?;

        let processing_errors = CounterVec::new(
            Opts::new(
                "relay_processing_errors_total",
                "Processing-loop errors not tied to a routing decision",
            )
            .namespace(NAMESPACE),
            &["kind"],
        )?;
        registry.register(Box::new(processing_errors.clone()))?;

        let jobs_finished = CounterVec::new(
            Opts::new("jobs_finished_total", "Job runs that reached a terminal state")
                .namespace(NAMESPACE),
            &["role", "outcome"],
        )?;
        registry.register(Box::new(jobs_finished.clone()))?;

        Ok(Self {
            received,
            forwarded,
            forward_duration,
            dead_letters,
            processing_errors,
            jobs_finished,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition of every registered metric, with its content type.
    pub fn render(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.gather(), &mut buf)?;
        Ok((encoder.format_type().to_string(), buf))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl RelayMetrics for PrometheusMetrics {
    fn record_received(&self) {
        self.received.inc();
    }

    fn record_forwarded(&self, duration_ms: u64) {
        self.forwarded.inc();
        self.forward_duration.observe(duration_ms as f64 / 1000.0);
    }

    fn record_dead_lettered(&self, reason: DeadLetterReason) {
        self.dead_letters
            .with_label_values(&[reason.as_label()])
            .inc();
    }

    fn record_processing_error(&self, kind: &str) {
        self.processing_errors.with_label_values(&[kind]).inc();
    }

    fn record_job_finished(&self, role: &str, outcome: JobOutcome) {
        self.jobs_finished
            .with_label_values(&[role, outcome.as_label()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn forwarded_updates_counter_and_histogram() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_received();
        m.record_forwarded(12);
        m.record_forwarded(30);

        let (_, body) = m.render().unwrap();
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("tandem_relay_messages_received_total 1"));
        assert!(body.contains("tandem_relay_messages_forwarded_total 2"));
        assert!(body.contains("tandem_relay_forward_duration_seconds_count 2"));
    }

    #[test]
    fn dead_letters_are_labelled_by_reason() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_dead_lettered(DeadLetterReason::IdentityMissing);
        m.record_dead_lettered(DeadLetterReason::CounterpartNotFound);
        m.record_dead_lettered(DeadLetterReason::IdentityMissing);

        let families = m.gather();
        assert_eq!(
            family(&families, "tandem_relay_dead_letters_total")
                .get_metric()
                .len(),
            2
        );
    }

    #[test]
    fn render_produces_text_exposition() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_job_finished("solver", JobOutcome::Done);
        m.record_processing_error("settle");

        let (content_type, body) = m.render().unwrap();
        let body = String::from_utf8(body).unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains(r#"tandem_jobs_finished_total{outcome="done",role="solver"} 1"#));
        assert!(body.contains(r#"tandem_relay_processing_errors_total{kind="settle"} 1"#));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
