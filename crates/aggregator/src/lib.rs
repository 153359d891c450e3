// crates/aggregator/src/lib.rs
//! Absorbs the raw query stream, filters it, batches it into the trie and
//! the durable phrase-count store, and maintains trending scores.
//!
//! The intake path (`process_query`) is expected to run at high rate and
//! must never block on the durable store; the periodic `flush` is where
//! durability and trie updates happen.

mod buffer;
mod quality;
mod store;
mod trending;

pub use buffer::{AggregationBuffer, FlushedEntry};
pub use quality::is_low_quality;
pub use store::{
    FilteredPhraseStore, InMemoryFilteredPhraseStore, InMemoryPhraseCountStore,
    InMemoryQueryLogSink, PhraseCountStore, QueryLogSink, StoreError,
};
pub use trending::TrendingTracker;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use typeahead_resilience::CircuitBreaker;
use typeahead_trie::SharedTrie;
use typeahead_types::{Phrase, PhraseError};

#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    pub max_phrase_len: usize,
    pub rebuild_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_phrase_len: typeahead_types::DEFAULT_MAX_PHRASE_LEN,
            rebuild_limit: 100_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("invalid phrase: {0}")]
    InvalidPhrase(#[from] PhraseError),
}

/// Outcome of a single `flush()` cycle, mainly useful for logging/metrics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FlushReport {
    pub phrases_processed: usize,
    pub phrases_failed: usize,
}

pub struct Aggregator {
    trie: Arc<SharedTrie>,
    buffer: AggregationBuffer,
    trending: Mutex<TrendingTracker>,
    phrase_count_store: Arc<dyn PhraseCountStore>,
    query_log_sink: Arc<dyn QueryLogSink>,
    filtered_store: Arc<dyn FilteredPhraseStore>,
    filter_mirror: RwLock<HashSet<Phrase>>,
    mirror_loaded: AtomicBool,
    database_breaker: Arc<CircuitBreaker>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        trie: Arc<SharedTrie>,
        phrase_count_store: Arc<dyn PhraseCountStore>,
        query_log_sink: Arc<dyn QueryLogSink>,
        filtered_store: Arc<dyn FilteredPhraseStore>,
        database_breaker: Arc<CircuitBreaker>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            trie,
            buffer: AggregationBuffer::new(),
            trending: Mutex::new(TrendingTracker::new(Utc::now())),
            phrase_count_store,
            query_log_sink,
            filtered_store,
            filter_mirror: RwLock::new(HashSet::new()),
            mirror_loaded: AtomicBool::new(false),
            database_breaker,
            config,
        }
    }

    /// Load the blocklist mirror from the durable store. Call once at
    /// startup; `add_filter`/`remove_filter` keep it in sync afterwards.
    pub async fn load_filter_mirror(&self) -> Result<(), StoreError> {
        let phrases = self.filtered_store.all().await?;
        let mut mirror = self.filter_mirror.write();
        mirror.clear();
        mirror.extend(phrases);
        self.mirror_loaded.store(true, Ordering::Release);
        Ok(())
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Normalize, filter, and (if accepted) record `query`. Returns `true`
    /// if the query was buffered, `false` if it was rejected by a quality
    /// or inappropriate-content filter. Never returns an error: malformed
    /// input is just another rejection reason.
    pub async fn process_query(
        &self,
        query: &str,
        user_id: Option<&str>,
        session_id: Option<&str>,
    ) -> bool {
        let now = Utc::now();

        if is_low_quality(query) {
            debug!(query, "rejected: low quality");
            typeahead_observability::record_filtered_query("low_quality");
            return false;
        }

        let phrase = match Phrase::parse(query, self.config.max_phrase_len) {
            Ok(p) => p,
            Err(e) => {
                debug!(query, error = %e, "rejected: invalid phrase");
                typeahead_observability::record_filtered_query("invalid_phrase");
                return false;
            }
        };

        if self.is_inappropriate(&phrase).await {
            debug!(phrase = phrase.as_str(), "rejected: inappropriate");
            typeahead_observability::record_filtered_query("inappropriate");
            return false;
        }

        self.buffer.record(&phrase, now);
        self.trending.lock().record(&phrase, now);

        if let Err(e) = self
            .query_log_sink
            .append(&phrase, user_id, session_id, now)
            .await
        {
            // The query log is best-effort from the caller's perspective;
            // losing an entry must not block intake.
            warn!(phrase = phrase.as_str(), error = %e, "query log append failed");
        }

        true
    }

    /// `is_inappropriate` per spec §4.2: trust the in-memory mirror when
    /// it's loaded; otherwise fall back to the authoritative store through
    /// the database breaker, defaulting to "accept" (`false`) if the
    /// breaker is open — availability over filtering precision.
    async fn is_inappropriate(&self, phrase: &Phrase) -> bool {
        if self.mirror_loaded.load(Ordering::Acquire) {
            return self.filter_mirror.read().contains(phrase);
        }

        let store = self.filtered_store.clone();
        let phrase_owned = phrase.clone();
        let result = self
            .database_breaker
            .call(move || {
                let store = store.clone();
                let phrase_owned = phrase_owned.clone();
                async move { store.contains(&phrase_owned).await }
            })
            .await;

        match result {
            Ok(is_filtered) => is_filtered,
            Err(_) => false,
        }
    }

    /// Drain the buffer, upsert each phrase into the durable store and the
    /// trie, then recompute trending. Runs on a fixed interval and once
    /// more at shutdown.
    pub async fn flush(&self) -> FlushReport {
        let drained = self.buffer.drain();
        let mut report = FlushReport::default();
        if drained.is_empty() {
            self.trending.lock().aggregate();
            return report;
        }

        let mut accepted = Vec::with_capacity(drained.len());
        for entry in &drained {
            match self
                .phrase_count_store
                .upsert(&entry.phrase, entry.delta, entry.last_seen)
                .await
            {
                Ok(()) => {
                    report.phrases_processed += 1;
                    accepted.push(entry);
                }
                Err(e) => {
                    report.phrases_failed += 1;
                    warn!(
                        phrase = entry.phrase.as_str(),
                        error = %e,
                        "durable phrase-count upsert failed; delta dropped for this phrase"
                    );
                }
            }
        }

        self.trie.batch_update(|trie| {
            for entry in &accepted {
                // Deltas are positive by construction (each buffered record
                // increments by exactly 1), so this cannot fail.
                let _ = trie.increment_at(entry.phrase.as_str(), entry.delta, entry.last_seen);
            }
        });

        self.trending.lock().aggregate();
        report
    }

    pub fn decay_trending(&self) {
        self.trending.lock().decay();
    }

    pub fn trending_score(&self, phrase: &Phrase) -> Option<f64> {
        self.trending.lock().score(phrase)
    }

    /// Rebuild the trie from the top `rebuild_limit` phrases in the durable
    /// store (already filtered to `is_filtered = false` by the store
    /// implementation) and atomically swap it in. Cache invalidation is the
    /// caller's responsibility (the cache lives in `typeahead-server`).
    pub async fn rebuild_trie(&self) -> Result<usize, StoreError> {
        let top = self
            .phrase_count_store
            .top_phrases(self.config.rebuild_limit)
            .await?;
        let count = top.len();
        let fresh = typeahead_trie::Trie::rebuild(
            self.trie.snapshot().top_k_param(),
            self.config.max_phrase_len,
            top,
        );
        self.trie.replace(fresh);
        Ok(count)
    }

    pub async fn add_filter(&self, phrase: &Phrase, reason: &str) -> Result<(), StoreError> {
        self.filtered_store.add(phrase, reason, Utc::now()).await?;
        self.filter_mirror.write().insert(phrase.clone());
        Ok(())
    }

    pub async fn remove_filter(&self, phrase: &Phrase) -> Result<(), StoreError> {
        self.filtered_store.remove(phrase).await?;
        self.filter_mirror.write().remove(phrase);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeahead_resilience::BreakerConfig;

    fn test_aggregator() -> Aggregator {
        let trie = Arc::new(SharedTrie::new(typeahead_trie::Trie::with_defaults()));
        let breaker = Arc::new(CircuitBreaker::new(
            "database",
            BreakerConfig {
                timeout_ms: 1_000,
                error_threshold_pct: 50,
                volume_threshold: 5,
                reset_timeout_ms: 15_000,
            },
        ));
        Aggregator::new(
            trie,
            Arc::new(InMemoryPhraseCountStore::default()),
            Arc::new(InMemoryQueryLogSink::default()),
            Arc::new(InMemoryFilteredPhraseStore::default()),
            breaker,
            AggregatorConfig::default(),
        )
    }

    #[tokio::test]
    async fn process_query_buffers_good_input_and_rejects_low_quality() {
        let agg = test_aggregator();
        assert!(agg.process_query("search engine", None, None).await);
        assert_eq!(agg.buffer_size(), 1);

        assert!(!agg.process_query("1234567890", None, None).await);
        assert_eq!(agg.buffer_size(), 1);
    }

    #[tokio::test]
    async fn process_query_rejects_filtered_phrase_once_mirror_loaded() {
        let agg = test_aggregator();
        let spam = Phrase::parse_default("spam phrase").unwrap();
        agg.add_filter(&spam, "abuse").await.unwrap();
        agg.load_filter_mirror().await.unwrap();

        assert!(!agg.process_query("spam phrase", None, None).await);
        assert_eq!(agg.buffer_size(), 0);
    }

    #[tokio::test]
    async fn flush_moves_buffer_deltas_into_trie_and_durable_store() {
        let agg = test_aggregator();
        for _ in 0..3 {
            agg.process_query("search engine", None, None).await;
        }
        let report = agg.flush().await;
        assert_eq!(report.phrases_processed, 1);
        assert_eq!(report.phrases_failed, 0);
        assert_eq!(agg.buffer_size(), 0);

        let snap = agg.trie.snapshot();
        assert_eq!(snap.count("search engine"), Some(3));
    }

    #[tokio::test]
    async fn scenario_2_sixty_events_evict_stale_topk_entry() {
        let agg = test_aggregator();
        agg.trie.batch_update(|trie| {
            trie.insert("search engine", 100).unwrap();
            trie.insert("search bar", 50).unwrap();
            trie.insert("sea turtle", 10).unwrap();
        });

        for _ in 0..60 {
            agg.process_query("sea turtle", None, None).await;
        }
        agg.flush().await;

        let snap = agg.trie.snapshot();
        let top = snap.lookup("s");
        let phrases: Vec<_> = top.iter().map(|s| s.phrase.as_str()).collect();
        assert!(phrases.contains(&"sea turtle"));
        assert_eq!(snap.count("sea turtle"), Some(70));
    }

    #[tokio::test]
    async fn rebuild_trie_replaces_live_trie_from_durable_store() {
        let agg = test_aggregator();
        agg.phrase_count_store
            .upsert(&Phrase::parse_default("search engine").unwrap(), 100, Utc::now())
            .await
            .unwrap();
        agg.phrase_count_store
            .upsert(&Phrase::parse_default("sea turtle").unwrap(), 10, Utc::now())
            .await
            .unwrap();

        let count = agg.rebuild_trie().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(agg.trie.snapshot().size(), 2);
    }
}
