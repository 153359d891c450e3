// crates/resilience/src/lib.rs
//! Cross-cutting resilience primitives shared by every external dependency
//! call on the suggestion read path and the aggregation write path:
//! circuit breakers, a sliding-window rate limiter, and a short-lived
//! idempotency store.

pub mod breaker;
pub mod idempotency;
pub mod rate_limit;

use std::sync::Arc;

pub use breaker::{BreakerConfig, BreakerError, BreakerObserver, BreakerState, CircuitBreaker};
pub use idempotency::IdempotencyStore;
pub use rate_limit::{RateLimitError, RateLimiter, RateLimiterConfig};

/// The three pre-configured breakers from spec §4.5, as a convenience
/// registry. Callers may still construct ad-hoc `CircuitBreaker`s. Fields are
/// `Arc`-wrapped so a breaker can be shared with a collaborator that needs its
/// own owned handle (e.g. the aggregator's database writes) without risking a
/// second, independently-stateful breaker for the same dependency.
pub struct BreakerRegistry {
    pub suggestion_service: Arc<CircuitBreaker>,
    pub database: Arc<CircuitBreaker>,
    pub redis_cache: Arc<CircuitBreaker>,
}

impl BreakerRegistry {
    /// Build the registry from caller-supplied tunings, e.g. a `Config`'s
    /// `breaker_*` fields, so environment overrides actually take effect.
    pub fn new(
        suggestion_service: BreakerConfig,
        database: BreakerConfig,
        redis_cache: BreakerConfig,
    ) -> Self {
        Self {
            suggestion_service: Arc::new(CircuitBreaker::new("suggestion_service", suggestion_service)),
            database: Arc::new(CircuitBreaker::new("database", database)),
            redis_cache: Arc::new(CircuitBreaker::new("redis_cache", redis_cache)),
        }
    }

    /// Like `new`, but every breaker forwards lifecycle events to `observer`
    /// instead of the default no-op — the hook point metrics/audit logging
    /// wires into.
    pub fn new_with_observer(
        suggestion_service: BreakerConfig,
        database: BreakerConfig,
        redis_cache: BreakerConfig,
        observer: Arc<dyn BreakerObserver>,
    ) -> Self {
        Self {
            suggestion_service: Arc::new(CircuitBreaker::with_observer(
                "suggestion_service",
                suggestion_service,
                observer.clone(),
            )),
            database: Arc::new(CircuitBreaker::with_observer(
                "database",
                database,
                observer.clone(),
            )),
            redis_cache: Arc::new(CircuitBreaker::with_observer(
                "redis_cache",
                redis_cache,
                observer,
            )),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            BreakerConfig {
                timeout_ms: 50,
                error_threshold_pct: 30,
                volume_threshold: 10,
                reset_timeout_ms: 5_000,
            },
            BreakerConfig {
                timeout_ms: 1_000,
                error_threshold_pct: 50,
                volume_threshold: 5,
                reset_timeout_ms: 15_000,
            },
            BreakerConfig {
                timeout_ms: 50,
                error_threshold_pct: 50,
                volume_threshold: 10,
                reset_timeout_ms: 5_000,
            },
        )
    }
}
