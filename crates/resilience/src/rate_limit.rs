// crates/resilience/src/rate_limit.rs
//! Sliding-window rate limiter keyed by `(identifier, endpoint)`.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub requests: u32,
    pub window_ms: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("rate limit exceeded, retry after {retry_after_secs}s")]
pub struct RateLimitError {
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Mutex<HashMap<(String, String), VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request attempt for `(identifier, endpoint)` and admit or
    /// reject it against the sliding window.
    pub fn check(&self, identifier: &str, endpoint: &str) -> Result<(), RateLimitError> {
        let window = Duration::from_millis(self.config.window_ms);
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let key = (identifier.to_string(), endpoint.to_string());
        let entry = windows.entry(key).or_insert_with(VecDeque::new);

        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() as u32 >= self.config.requests {
            let oldest = *entry.front().expect("len >= requests > 0 implies non-empty");
            let elapsed = now.duration_since(oldest);
            let remaining = window.saturating_sub(elapsed);
            let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(RateLimitError { retry_after_secs });
        }

        entry.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_3_admits_up_to_limit_then_rejects_with_retry_after() {
        // 3 requests/second limit.
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests: 3,
            window_ms: 1_000,
        });
        let identifier = "user-42";
        let endpoint = "suggest";

        assert!(limiter.check(identifier, endpoint).is_ok());
        assert!(limiter.check(identifier, endpoint).is_ok());
        assert!(limiter.check(identifier, endpoint).is_ok());

        let rejection = limiter.check(identifier, endpoint).unwrap_err();
        assert!(rejection.retry_after_secs >= 1);
    }

    #[test]
    fn distinct_identifiers_have_independent_windows() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests: 1,
            window_ms: 1_000,
        });
        assert!(limiter.check("a", "suggest").is_ok());
        assert!(limiter.check("b", "suggest").is_ok());
        assert!(limiter.check("a", "suggest").is_err());
    }

    #[test]
    fn distinct_endpoints_have_independent_windows() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests: 1,
            window_ms: 1_000,
        });
        assert!(limiter.check("a", "suggest").is_ok());
        assert!(limiter.check("a", "log_query").is_ok());
    }

    #[test]
    fn window_slides_and_admits_again_after_expiry() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            requests: 1,
            window_ms: 20,
        });
        assert!(limiter.check("a", "suggest").is_ok());
        assert!(limiter.check("a", "suggest").is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("a", "suggest").is_ok());
    }
}
