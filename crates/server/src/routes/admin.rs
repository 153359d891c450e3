// crates/server/src/routes/admin.rs
//! Operator endpoints from spec §6: trie rebuild, cache invalidation,
//! blocklist maintenance, and a stats snapshot.

use axum::{extract::State, routing::post, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use typeahead_resilience::BreakerState;
use typeahead_types::Phrase;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct RebuildResponse {
    pub phrases_indexed: usize,
}

pub async fn rebuild_trie(State(state): State<Arc<AppState>>) -> ApiResult<Json<RebuildResponse>> {
    let count = state
        .aggregator
        .rebuild_trie()
        .await
        .map_err(|e| ApiError::DependencyUnavailable(e.to_string()))?;
    state.suggestion_cache.clear_all();
    Ok(Json(RebuildResponse { phrases_indexed: count }))
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheRequest {
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ClearCacheResponse {
    pub cleared: bool,
}

pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClearCacheRequest>,
) -> Json<ClearCacheResponse> {
    match request.pattern {
        Some(pattern) => state.suggestion_cache.clear_pattern(&pattern),
        None => state.suggestion_cache.clear_all(),
    }
    Json(ClearCacheResponse { cleared: true })
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub phrase: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct FilterResponse {
    pub phrase: String,
}

pub async fn add_filter(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<Json<FilterResponse>> {
    let phrase = Phrase::parse(&request.phrase, state.config.max_phrase_len)
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let reason = request.reason.as_deref().unwrap_or("unspecified");

    state
        .aggregator
        .add_filter(&phrase, reason)
        .await
        .map_err(|e| ApiError::DependencyUnavailable(e.to_string()))?;
    tracing::info!(phrase = phrase.as_str(), reason, "phrase added to blocklist");
    state.suggestion_cache.clear_all();

    Ok(Json(FilterResponse {
        phrase: phrase.as_str().to_string(),
    }))
}

pub async fn remove_filter(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<Json<FilterResponse>> {
    let phrase = Phrase::parse(&request.phrase, state.config.max_phrase_len)
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

    state
        .aggregator
        .remove_filter(&phrase)
        .await
        .map_err(|e| ApiError::DependencyUnavailable(e.to_string()))?;
    tracing::info!(phrase = phrase.as_str(), "phrase removed from blocklist");
    state.suggestion_cache.clear_all();

    Ok(Json(FilterResponse {
        phrase: phrase.as_str().to_string(),
    }))
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct TrieStatsView {
    pub phrase_count: usize,
    pub node_count: usize,
    pub max_depth: usize,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CircuitStatesView {
    pub suggestion_service: &'static str,
    pub database: &'static str,
    pub redis_cache: &'static str,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StatsResponse {
    pub trie: TrieStatsView,
    pub buffer_size: usize,
    pub circuits: CircuitStatesView,
    pub uptime_secs: u64,
}

fn breaker_state_name(state: BreakerState) -> &'static str {
    match state {
        BreakerState::Closed => "closed",
        BreakerState::Open => "open",
        BreakerState::HalfOpen => "half_open",
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let snapshot = state.trie.snapshot();
    let trie_stats = snapshot.stats();
    typeahead_observability::record_trie_stats(
        trie_stats.phrase_count,
        trie_stats.node_count,
        trie_stats.max_depth,
    );

    for (name, breaker_state) in [
        ("suggestion_service", state.breakers.suggestion_service.state()),
        ("database", state.breakers.database.state()),
        ("redis_cache", state.breakers.redis_cache.state()),
    ] {
        typeahead_observability::record_breaker_state(name, breaker_state as u8);
    }

    Json(StatsResponse {
        trie: TrieStatsView {
            phrase_count: trie_stats.phrase_count,
            node_count: trie_stats.node_count,
            max_depth: trie_stats.max_depth,
        },
        buffer_size: state.aggregator.buffer_size(),
        circuits: CircuitStatesView {
            suggestion_service: breaker_state_name(state.breakers.suggestion_service.state()),
            database: breaker_state_name(state.breakers.database.state()),
            redis_cache: breaker_state_name(state.breakers.redis_cache.state()),
        },
        uptime_secs: state.uptime_secs(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/rebuild", post(rebuild_trie))
        .route("/admin/cache", post(clear_cache))
        .route("/admin/filters", post(add_filter))
        .route("/admin/filters/remove", post(remove_filter))
        .route("/admin/stats", get(stats))
}
