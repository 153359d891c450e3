// crates/server/src/routes/query.rs
//! POST /queries — the write endpoint from spec §6. Fire-and-forget: the
//! aggregator's intake buffer absorbs the query and the handler returns
//! 202 Accepted without waiting for a flush.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::{AppState, CachedResponse};

#[derive(Debug, Deserialize)]
pub struct LogQueryRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct LogQueryResponse {
    pub accepted: bool,
}

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// POST /queries, optionally carrying an `Idempotency-Key` header per spec
/// §7's duplicate-write handling.
pub async fn log_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LogQueryRequest>,
) -> ApiResult<(StatusCode, Json<LogQueryResponse>)> {
    let identifier = request.user_id.as_deref().unwrap_or("anonymous");
    crate::ratelimit::enforce(&state, identifier, "log_query")?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|raw| {
            typeahead_resilience::idempotency::derive_key("log_query", &format!("{raw}:{}", request.query))
        });

    if let Some(key) = &idempotency_key {
        if let Some(cached) = state.idempotency.get(key) {
            typeahead_observability::record_idempotency_duplicate("log_query");
            let response: LogQueryResponse = serde_json::from_value(cached.body)
                .unwrap_or(LogQueryResponse { accepted: true });
            let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::ACCEPTED);
            return Ok((status, Json(response)));
        }
        if !state.idempotency.try_acquire_lock(key) {
            // Another in-flight request owns this key; treat this one as a
            // duplicate rather than double-processing the same write.
            typeahead_observability::record_idempotency_duplicate("log_query");
            return Ok((StatusCode::ACCEPTED, Json(LogQueryResponse { accepted: true })));
        }
    }

    let accepted = state
        .aggregator
        .process_query(
            &request.query,
            request.user_id.as_deref(),
            request.session_id.as_deref(),
        )
        .await;

    let response = LogQueryResponse { accepted };

    if let Some(key) = &idempotency_key {
        state.idempotency.record(
            key,
            CachedResponse {
                status: StatusCode::ACCEPTED.as_u16(),
                body: serde_json::to_value(&response).unwrap_or(serde_json::json!({})),
            },
        );
        state.idempotency.release_lock(key);
        typeahead_observability::record_idempotency_processed("log_query");
    }

    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/queries", post(log_query))
}
