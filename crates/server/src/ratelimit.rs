// crates/server/src/ratelimit.rs
//! Thin bridge from `typeahead_resilience::RateLimiter` to `ApiError`,
//! shared by every route that must enforce the per-identifier window.

use crate::error::ApiError;
use crate::state::AppState;

pub fn enforce(state: &AppState, identifier: &str, endpoint: &str) -> Result<(), ApiError> {
    state.rate_limiter.check(identifier, endpoint).map_err(|e| {
        typeahead_observability::record_rate_limit_hit(endpoint);
        ApiError::RateLimited {
            retry_after_secs: e.retry_after_secs,
        }
    })
}
