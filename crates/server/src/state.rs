// crates/server/src/state.rs
//! Shared application state handed to every route handler as
//! `State<Arc<AppState>>`, mirroring the teacher's single-`AppState`-struct
//! convention.

use crate::cache::SuggestionCache;
use crate::config::Config;
use crate::personalization::PersonalizationStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use typeahead_aggregator::Aggregator;
use typeahead_db::Database;
use typeahead_resilience::{BreakerRegistry, IdempotencyStore, RateLimiter};
use typeahead_trie::SharedTrie;

/// A cached response for a previously executed idempotent write, replayed
/// verbatim on a retry bearing the same idempotency key.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

pub struct AppState {
    pub start_time: Instant,
    pub config: Config,
    pub db: Database,
    pub trie: Arc<SharedTrie>,
    pub aggregator: Arc<Aggregator>,
    pub breakers: Arc<BreakerRegistry>,
    pub rate_limiter: RateLimiter,
    pub idempotency: IdempotencyStore<CachedResponse>,
    pub suggestion_cache: SuggestionCache,
    pub personalization: PersonalizationStore,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        trie: Arc<SharedTrie>,
        aggregator: Arc<Aggregator>,
        breakers: Arc<BreakerRegistry>,
    ) -> Arc<Self> {
        let rate_limiter = RateLimiter::new(config.rate_limiter);
        let idempotency = IdempotencyStore::new(Duration::from_secs(config.idempotency_ttl_sec));
        let suggestion_cache = SuggestionCache::new(Duration::from_secs(config.cache_ttl_sec));

        Arc::new(Self {
            start_time: Instant::now(),
            config,
            db,
            trie,
            aggregator,
            breakers,
            rate_limiter,
            idempotency,
            suggestion_cache,
            personalization: PersonalizationStore::new(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
