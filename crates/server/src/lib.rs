// crates/server/src/lib.rs
//! The suggestion service's HTTP surface: wires the trie, aggregator,
//! ranking, and resilience crates into an Axum app. Route handlers are
//! thin — the actual read-path orchestration lives in `suggest.rs`.

pub mod cache;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod personalization;
pub mod ratelimit;
pub mod routes;
pub mod state;
pub mod suggest;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the Axum app for a given `AppState`. Split from binary startup so
/// tests can spin up a full router against an in-memory `AppState` without
/// touching a socket.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Spawn the background flush/decay timers from spec §4.2 and §9: dedicated
/// tasks that wake on a fixed interval, run one cycle, and keep going until
/// the process exits. `flush` additionally runs once more on shutdown by
/// virtue of `run_flush_loop` being called again from the shutdown path in
/// `main`.
pub async fn run_flush_loop(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; skip it, flush is on cadence
    loop {
        ticker.tick().await;
        let report = state.aggregator.flush().await;
        typeahead_observability::record_buffer_size(state.aggregator.buffer_size());
        if report.phrases_failed > 0 {
            tracing::warn!(
                processed = report.phrases_processed,
                failed = report.phrases_failed,
                "flush cycle had durable-store failures"
            );
        } else {
            tracing::debug!(processed = report.phrases_processed, "flush cycle complete");
        }
    }
}

/// Hourly trending decay task from spec §4.2 `decay_trending`.
pub async fn run_decay_loop(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        state.aggregator.decay_trending();
        tracing::debug!("trending decay cycle complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::to_bytes;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use typeahead_aggregator::{
        Aggregator, AggregatorConfig, InMemoryFilteredPhraseStore, InMemoryPhraseCountStore,
        InMemoryQueryLogSink,
    };
    use typeahead_db::Database;
    use typeahead_resilience::{BreakerConfig, BreakerRegistry, CircuitBreaker};
    use typeahead_trie::{SharedTrie, Trie};

    async fn test_state() -> Arc<AppState> {
        let trie = Arc::new(SharedTrie::new(Trie::with_defaults()));
        trie.batch_update(|t| {
            t.insert("search engine", 100).unwrap();
        });
        let breaker = Arc::new(CircuitBreaker::new(
            "database",
            BreakerConfig {
                timeout_ms: 1_000,
                error_threshold_pct: 50,
                volume_threshold: 5,
                reset_timeout_ms: 15_000,
            },
        ));
        let aggregator = Arc::new(Aggregator::new(
            trie.clone(),
            Arc::new(InMemoryPhraseCountStore::default()),
            Arc::new(InMemoryQueryLogSink::default()),
            Arc::new(InMemoryFilteredPhraseStore::default()),
            breaker,
            AggregatorConfig::default(),
        ));
        let breakers = Arc::new(BreakerRegistry::with_defaults());
        let db = Database::new_in_memory().await.unwrap();
        AppState::new(Config::default(), db, trie, aggregator, breakers)
    }

    #[tokio::test]
    async fn health_endpoint_responds_ok() {
        let app = create_app(test_state().await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn suggest_endpoint_returns_matches() {
        let app = create_app(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/suggestions?prefix=s")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["suggestions"][0]["phrase"], "search engine");
    }
}
