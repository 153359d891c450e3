// crates/server/src/routes/suggest.rs
//! GET /suggestions — the read endpoint from spec §6.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::suggest::{suggest, SuggestOptions};

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub prefix: String,
    pub limit: Option<usize>,
    pub user_id: Option<String>,
    pub skip_cache: Option<bool>,
    pub allow_fuzzy: Option<bool>,
    pub max_edit_distance: Option<usize>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct SuggestResponse {
    pub suggestions: Vec<typeahead_types::Suggestion>,
    pub latency_hint_ms: u64,
    pub cache_hit: bool,
}

/// GET /suggestions?prefix=..&limit=..&user_id=..
///
/// `prefix` arrives already percent-decoded by Axum's query-string
/// extractor; this handler only trims/lowercases via the trie's own
/// normalization on the read path.
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestQuery>,
) -> ApiResult<Json<SuggestResponse>> {
    let started = Instant::now();

    let identifier = params.user_id.as_deref().unwrap_or("anonymous");
    crate::ratelimit::enforce(&state, identifier, "suggest")?;

    let mut options = SuggestOptions::new(params.user_id.as_deref());
    if let Some(limit) = params.limit {
        options.limit = limit;
    }
    options.skip_cache = params.skip_cache.unwrap_or(false);
    options.allow_fuzzy = params.allow_fuzzy.unwrap_or(true);
    if let Some(max_edit_distance) = params.max_edit_distance {
        options.max_edit_distance = max_edit_distance;
    }

    let cache_hit_for_metrics;
    let result = match tokio::time::timeout(
        std::time::Duration::from_millis(100),
        suggest(&state, &params.prefix, options),
    )
    .await
    {
        Ok(result) => {
            cache_hit_for_metrics = result.cache_hit;
            result
        }
        Err(_) => {
            return Err(ApiError::DependencyUnavailable(
                "suggestion read path exceeded 100ms budget".to_string(),
            ));
        }
    };

    let duration = started.elapsed();
    typeahead_observability::record_suggestion_request(
        "suggestions",
        cache_hit_for_metrics,
        "ok",
        duration,
    );

    Ok(Json(SuggestResponse {
        suggestions: result.suggestions,
        latency_hint_ms: duration.as_millis() as u64,
        cache_hit: result.cache_hit,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/suggestions", get(suggestions))
}
