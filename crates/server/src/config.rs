// crates/server/src/config.rs
//! Environment-driven configuration, defaults per spec §6 "Environment".
//! Follows the teacher's "env var with parsed fallback to default" idiom.

use typeahead_resilience::{BreakerConfig, RateLimiterConfig};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub top_k: usize,
    pub max_phrase_len: usize,
    pub flush_interval_ms: u64,
    pub decay_interval_ms: u64,
    pub cache_ttl_sec: u64,
    pub rebuild_limit: usize,
    pub idempotency_ttl_sec: u64,
    pub rate_limiter: RateLimiterConfig,
    pub breaker_suggestion_service: BreakerConfig,
    pub breaker_database: BreakerConfig,
    pub breaker_redis_cache: BreakerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env_or("PORT", 4790),
            top_k: env_or("TOP_K", typeahead_types::DEFAULT_TOP_K),
            max_phrase_len: env_or("MAX_PHRASE_LEN", typeahead_types::DEFAULT_MAX_PHRASE_LEN),
            flush_interval_ms: env_or("FLUSH_INTERVAL_MS", 30_000),
            decay_interval_ms: env_or("DECAY_INTERVAL_MS", 3_600_000),
            cache_ttl_sec: env_or("CACHE_TTL_SEC", 60),
            rebuild_limit: env_or("REBUILD_LIMIT", 100_000),
            idempotency_ttl_sec: env_or("IDEMPOTENCY_TTL_SEC", 300),
            rate_limiter: RateLimiterConfig {
                requests: env_or("RATE_LIMIT_REQUESTS", 120),
                window_ms: env_or("RATE_LIMIT_WINDOW_MS", 60_000),
            },
            breaker_suggestion_service: BreakerConfig {
                timeout_ms: env_or("BREAKER_SUGGESTION_TIMEOUT_MS", 50),
                error_threshold_pct: env_or("BREAKER_SUGGESTION_ERROR_PCT", 30),
                volume_threshold: env_or("BREAKER_SUGGESTION_VOLUME", 10),
                reset_timeout_ms: env_or("BREAKER_SUGGESTION_RESET_MS", 5_000),
            },
            breaker_database: BreakerConfig {
                timeout_ms: env_or("BREAKER_DATABASE_TIMEOUT_MS", 1_000),
                error_threshold_pct: env_or("BREAKER_DATABASE_ERROR_PCT", 50),
                volume_threshold: env_or("BREAKER_DATABASE_VOLUME", 5),
                reset_timeout_ms: env_or("BREAKER_DATABASE_RESET_MS", 15_000),
            },
            breaker_redis_cache: BreakerConfig {
                timeout_ms: env_or("BREAKER_CACHE_TIMEOUT_MS", 50),
                error_threshold_pct: env_or("BREAKER_CACHE_ERROR_PCT", 50),
                volume_threshold: env_or("BREAKER_CACHE_VOLUME", 10),
                reset_timeout_ms: env_or("BREAKER_CACHE_RESET_MS", 5_000),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        // SAFETY: single-threaded test, no other test in this process mutates these keys.
        for key in ["TOP_K", "MAX_PHRASE_LEN", "FLUSH_INTERVAL_MS", "CACHE_TTL_SEC", "REBUILD_LIMIT"] {
            std::env::remove_var(key);
        }
        let config = Config::default();
        assert_eq!(config.top_k, 10);
        assert_eq!(config.max_phrase_len, 100);
        assert_eq!(config.flush_interval_ms, 30_000);
        assert_eq!(config.cache_ttl_sec, 60);
        assert_eq!(config.rebuild_limit, 100_000);
        assert_eq!(config.rate_limiter.requests, 120);
        assert_eq!(config.rate_limiter.window_ms, 60_000);
    }
}
