// crates/observability/src/lib.rs
//! Tracing and Prometheus metrics setup shared by the suggestion service
//! binary. Kept as its own crate so `typeahead-server` doesn't have to
//! juggle recorder/subscriber bootstrapping inline — mirrors the teacher's
//! `crates/server/src/metrics.rs`, pulled out one level so the aggregator
//! and db crates could (in principle) emit metrics too without depending
//! on the server crate.
//!
//! Implements the Observability contract from spec §6: one counter or
//! histogram per named metric, with the label sets the spec calls for.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and describe every metric the
/// spec's Observability contract names. Call once at startup before any
/// metric is recorded. Returns `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("failed to install global metrics recorder (already set)");
        return false;
    }
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("failed to store Prometheus handle (already set)");
    }

    describe_metrics();
    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_histogram!(
        "suggestion_latency",
        "Suggestion read-path latency in seconds, by endpoint/cache_hit/status"
    );
    describe_counter!(
        "suggestion_requests_total",
        "Total suggestion requests by endpoint and status"
    );
    describe_counter!(
        "cache_operations_total",
        "Suggestion cache operations by operation and result"
    );
    describe_gauge!("trie_phrase_count", "Number of distinct phrases indexed");
    describe_gauge!("trie_node_count", "Number of trie nodes (including tombstoned)");
    describe_gauge!("trie_max_depth", "Maximum trie depth observed at the last stats() call");
    describe_gauge!("aggregation_buffer_size", "Pending phrase count in the aggregation buffer");
    describe_counter!(
        "queries_filtered_total",
        "Queries rejected before buffering, by reason"
    );
    describe_gauge!("circuit_breaker_state", "Breaker state by name: 0=closed 1=open 2=half_open");
    describe_counter!("circuit_breaker_failures_total", "Breaker-recorded failures by name");
    describe_counter!("circuit_breaker_fallbacks_total", "Breaker fallback invocations by name");
    describe_counter!("rate_limit_hits_total", "Rejected requests by endpoint");
    describe_counter!("idempotency_duplicates_total", "Replayed idempotent responses by operation");
    describe_counter!("idempotency_processed_total", "Freshly executed idempotent operations by operation");
}

/// Render current metrics in Prometheus text exposition format. `None` if
/// `init_metrics` was never called.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_suggestion_request(endpoint: &str, cache_hit: bool, status: &str, duration: Duration) {
    let cache_hit_label = if cache_hit { "true" } else { "false" };
    counter!("suggestion_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(
        "suggestion_latency",
        "endpoint" => endpoint.to_string(),
        "cache_hit" => cache_hit_label,
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_cache_operation(operation: &str, result: &str) {
    counter!("cache_operations_total", "operation" => operation.to_string(), "result" => result.to_string())
        .increment(1);
}

pub fn record_trie_stats(phrase_count: usize, node_count: usize, max_depth: usize) {
    gauge!("trie_phrase_count").set(phrase_count as f64);
    gauge!("trie_node_count").set(node_count as f64);
    gauge!("trie_max_depth").set(max_depth as f64);
}

pub fn record_buffer_size(size: usize) {
    gauge!("aggregation_buffer_size").set(size as f64);
}

pub fn record_filtered_query(reason: &str) {
    counter!("queries_filtered_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_breaker_state(name: &str, state: u8) {
    gauge!("circuit_breaker_state", "name" => name.to_string()).set(state as f64);
}

pub fn record_breaker_failure(name: &str) {
    counter!("circuit_breaker_failures_total", "name" => name.to_string()).increment(1);
}

pub fn record_breaker_fallback(name: &str) {
    counter!("circuit_breaker_fallbacks_total", "name" => name.to_string()).increment(1);
}

pub fn record_rate_limit_hit(endpoint: &str) {
    counter!("rate_limit_hits_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_idempotency_duplicate(operation: &str) {
    counter!("idempotency_duplicates_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_idempotency_processed(operation: &str) {
    counter!("idempotency_processed_total", "operation" => operation.to_string()).increment(1);
}

/// Forwards circuit breaker lifecycle events to the metrics described above
/// and to `tracing`, per spec §9's "small trait/interface instead of an
/// event emitter" guidance — the component owning a set of breakers
/// registers one of these rather than wiring metrics calls into the
/// breaker itself.
pub struct MetricsBreakerObserver;

impl typeahead_resilience::BreakerObserver for MetricsBreakerObserver {
    fn on_open(&self, name: &str) {
        tracing::warn!(breaker = name, "circuit breaker opened");
    }

    fn on_close(&self, name: &str) {
        tracing::info!(breaker = name, "circuit breaker closed");
    }

    fn on_fallback(&self, name: &str) {
        record_breaker_fallback(name);
    }

    fn on_failure(&self, name: &str) {
        record_breaker_failure(name);
    }
}

/// Install the process-wide `tracing` subscriber. Respects `RUST_LOG`,
/// defaulting to `warn` — matches the teacher's `main.rs` convention.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("global tracing subscriber already set");
    }
}
