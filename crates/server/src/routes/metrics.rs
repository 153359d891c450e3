// crates/server/src/routes/metrics.rs
//! Prometheus exposition endpoint, backing the `stats()` admin
//! contract's Observability requirement (spec §6).

use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

async fn metrics_handler() -> (StatusCode, String) {
    match typeahead_observability::render_metrics() {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
