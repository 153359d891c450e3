// crates/resilience/src/breaker.rs
//! Per-dependency circuit breaker: closed / open / half-open, with
//! threshold + volume gating and an explicit observer hook instead of an
//! event emitter (there's no such thing in Rust — a small trait does the
//! job, per the spec's re-architecture guidance).

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Observable breaker state, also used as the Prometheus gauge value
/// (`circuit_breaker_state{name}`: 0/1/2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub timeout_ms: u64,
    pub error_threshold_pct: u8,
    pub volume_threshold: u32,
    pub reset_timeout_ms: u64,
}

/// Forwards breaker lifecycle events to metrics/audit logs. The component
/// that owns a set of breakers registers a single observer implementation.
pub trait BreakerObserver: Send + Sync {
    fn on_open(&self, _name: &str) {}
    fn on_close(&self, _name: &str) {}
    fn on_fallback(&self, _name: &str) {}
    fn on_failure(&self, _name: &str) {}
}

/// No-op observer, used when the caller doesn't need breaker events wired
/// anywhere (mainly tests).
pub struct NullObserver;
impl BreakerObserver for NullObserver {}

#[derive(Debug, Error)]
pub enum BreakerError<E> {
    #[error("circuit open")]
    CircuitOpen,
    #[error("call timed out")]
    Timeout,
    #[error(transparent)]
    Upstream(E),
}

struct Inner {
    state: BreakerState,
    window_start: Instant,
    volume: u32,
    failures: u32,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
}

pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    window: Duration,
    inner: Mutex<Inner>,
    observer: Arc<dyn BreakerObserver>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_observer(name, config, Arc::new(NullObserver))
    }

    pub fn with_observer(
        name: impl Into<String>,
        config: BreakerConfig,
        observer: Arc<dyn BreakerObserver>,
    ) -> Self {
        let window = Duration::from_millis(config.reset_timeout_ms).max(Duration::from_secs(10));
        Self {
            name: name.into(),
            config,
            window,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window_start: Instant::now(),
                volume: 0,
                failures: 0,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
            observer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        inner.state
    }

    /// Roll the counting window over if it has expired.
    fn roll_window_if_stale(&self, inner: &mut Inner) {
        if inner.window_start.elapsed() >= self.window {
            inner.window_start = Instant::now();
            inner.volume = 0;
            inner.failures = 0;
        }
    }

    fn maybe_transition_to_half_open(&self, inner: &mut Inner) {
        if inner.state == BreakerState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= Duration::from_millis(self.config.reset_timeout_ms) {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_probe_in_flight = false;
                }
            }
        }
    }

    /// Execute `f` through the breaker, honoring its timeout. Returns the
    /// fallback-free result; callers that want a fallback should use
    /// [`CircuitBreaker::call_with_fallback`].
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit_call() {
            return Err(BreakerError::CircuitOpen);
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, f()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure();
                Err(BreakerError::Upstream(e))
            }
            Err(_elapsed) => {
                self.record_failure();
                Err(BreakerError::Timeout)
            }
        }
    }

    /// Like `call`, but on `CircuitOpen` or error, invokes `fallback`
    /// instead of propagating — matching the spec's "breaker-wrapped trie
    /// lookup, fallback `_popular_fallback`" read-path shape.
    pub async fn call_with_fallback<F, Fut, T, E, Fb>(&self, f: F, fallback: Fb) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Fb: FnOnce() -> T,
    {
        match self.call(f).await {
            Ok(value) => value,
            Err(_) => {
                self.observer.on_fallback(&self.name);
                fallback()
            }
        }
    }

    /// Returns whether a call may proceed, reserving the single half-open
    /// probe slot if applicable.
    fn admit_call(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    false
                } else {
                    inner.half_open_probe_in_flight = true;
                    true
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Closed;
                inner.volume = 0;
                inner.failures = 0;
                inner.opened_at = None;
                inner.half_open_probe_in_flight = false;
                drop(inner);
                self.observer.on_close(&self.name);
            }
            BreakerState::Closed => {
                self.roll_window_if_stale(&mut inner);
                inner.volume += 1;
                inner.failures = inner.failures.saturating_sub(1);
            }
            BreakerState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_probe_in_flight = false;
                drop(inner);
                self.observer.on_failure(&self.name);
                self.observer.on_open(&self.name);
            }
            BreakerState::Closed => {
                self.roll_window_if_stale(&mut inner);
                inner.volume += 1;
                inner.failures += 1;
                let should_open = inner.volume >= self.config.volume_threshold
                    && (inner.failures * 100 / inner.volume) as u32
                        >= self.config.error_threshold_pct as u32;
                if should_open {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
                drop(inner);
                self.observer.on_failure(&self.name);
                if should_open {
                    self.observer.on_open(&self.name);
                }
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn small_config() -> BreakerConfig {
        BreakerConfig {
            timeout_ms: 50,
            error_threshold_pct: 30,
            volume_threshold: 10,
            reset_timeout_ms: 50,
        }
    }

    #[tokio::test]
    async fn closed_below_volume_threshold_stays_closed_regardless_of_failures() {
        let breaker = CircuitBreaker::new("t", small_config());
        for _ in 0..9 {
            let _ = breaker
                .call(|| async { Err::<(), &str>("boom") })
                .await;
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn scenario_4_opens_after_threshold_then_half_opens_then_closes() {
        let breaker = CircuitBreaker::new("suggestion_service", small_config());
        // 10 calls, 4 failures (40% >= 30% threshold) -> open.
        for i in 0..10 {
            let fail = i < 4;
            let _ = breaker
                .call(move || async move {
                    if fail {
                        Err::<(), &str>("boom")
                    } else {
                        Ok(())
                    }
                })
                .await;
        }
        assert_eq!(breaker.state(), BreakerState::Open);

        // While open, fallback is used without invoking the underlying call.
        let called = Arc::new(AtomicU32::new(0));
        let called_clone = called.clone();
        let result = breaker
            .call_with_fallback(
                move || {
                    called_clone.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<&str, &str>("real") }
                },
                || "fallback",
            )
            .await;
        assert_eq!(result, "fallback");
        assert_eq!(called.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        let ok = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert!(ok.is_ok());
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_and_resets_timer() {
        let breaker = CircuitBreaker::new("t", small_config());
        for _ in 0..10 {
            let _ = breaker.call(|| async { Err::<(), &str>("boom") }).await;
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        let _ = breaker.call(|| async { Err::<(), &str>("boom again") }).await;
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let config = BreakerConfig {
            timeout_ms: 5,
            error_threshold_pct: 10,
            volume_threshold: 1,
            reset_timeout_ms: 50,
        };
        let breaker = CircuitBreaker::new("t", config);
        let result = breaker
            .call(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<(), &str>(())
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Timeout)));
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
