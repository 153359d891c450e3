// crates/aggregator/src/store.rs
//! Storage seams the aggregator writes through. Kept as traits so
//! `typeahead-db` can provide the real sqlx-backed implementations while
//! tests use simple in-memory doubles — the aggregator itself never talks
//! to SQLite directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use parking_lot::Mutex;
use thiserror::Error;
use typeahead_types::Phrase;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("durable store unavailable: {0}")]
    Unavailable(String),
}

/// The durable `(phrase, count, last_updated, is_filtered)` table.
#[async_trait]
pub trait PhraseCountStore: Send + Sync {
    async fn upsert(&self, phrase: &Phrase, count_delta: u64, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Top-N phrases by count, excluding filtered ones, for `rebuild_trie`.
    async fn top_phrases(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError>;
}

/// Append-only raw query log: the source of truth for re-derivation.
#[async_trait]
pub trait QueryLogSink: Send + Sync {
    async fn append(
        &self,
        phrase: &Phrase,
        user_id: Option<&str>,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// The filtered-phrase (blocklist) table.
#[async_trait]
pub trait FilteredPhraseStore: Send + Sync {
    async fn contains(&self, phrase: &Phrase) -> Result<bool, StoreError>;
    async fn add(&self, phrase: &Phrase, reason: &str, now: DateTime<Utc>) -> Result<(), StoreError>;
    async fn remove(&self, phrase: &Phrase) -> Result<(), StoreError>;
    async fn all(&self) -> Result<Vec<Phrase>, StoreError>;
}

/// In-memory `PhraseCountStore`, mainly for tests and for a standalone
/// deployment that doesn't need cross-process durability.
#[derive(Default)]
pub struct InMemoryPhraseCountStore {
    counts: Mutex<HashMap<Phrase, (u64, DateTime<Utc>)>>,
}

#[async_trait]
impl PhraseCountStore for InMemoryPhraseCountStore {
    async fn upsert(&self, phrase: &Phrase, count_delta: u64, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut counts = self.counts.lock();
        let entry = counts.entry(phrase.clone()).or_insert((0, now));
        entry.0 += count_delta;
        entry.1 = now;
        Ok(())
    }

    async fn top_phrases(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let counts = self.counts.lock();
        let mut all: Vec<(String, u64)> = counts
            .iter()
            .map(|(phrase, (count, _))| (phrase.as_str().to_string(), *count))
            .collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(limit);
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryQueryLogSink {
    entries: Mutex<Vec<(Phrase, Option<String>, Option<String>, DateTime<Utc>)>>,
}

#[async_trait]
impl QueryLogSink for InMemoryQueryLogSink {
    async fn append(
        &self,
        phrase: &Phrase,
        user_id: Option<&str>,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.entries.lock().push((
            phrase.clone(),
            user_id.map(str::to_string),
            session_id.map(str::to_string),
            now,
        ));
        Ok(())
    }
}

impl InMemoryQueryLogSink {
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemoryFilteredPhraseStore {
    phrases: Mutex<HashSet<Phrase>>,
}

#[async_trait]
impl FilteredPhraseStore for InMemoryFilteredPhraseStore {
    async fn contains(&self, phrase: &Phrase) -> Result<bool, StoreError> {
        Ok(self.phrases.lock().contains(phrase))
    }

    async fn add(&self, phrase: &Phrase, _reason: &str, _now: DateTime<Utc>) -> Result<(), StoreError> {
        self.phrases.lock().insert(phrase.clone());
        Ok(())
    }

    async fn remove(&self, phrase: &Phrase) -> Result<(), StoreError> {
        self.phrases.lock().remove(phrase);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Phrase>, StoreError> {
        Ok(self.phrases.lock().iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_phrase_count_store_upserts_and_orders_top_phrases() {
        let store = InMemoryPhraseCountStore::default();
        let now = Utc::now();
        store
            .upsert(&Phrase::parse_default("search engine").unwrap(), 100, now)
            .await
            .unwrap();
        store
            .upsert(&Phrase::parse_default("sea turtle").unwrap(), 10, now)
            .await
            .unwrap();

        let top = store.top_phrases(10).await.unwrap();
        assert_eq!(top[0].0, "search engine");
        assert_eq!(top[0].1, 100);
    }

    #[tokio::test]
    async fn in_memory_filtered_phrase_store_add_remove() {
        let store = InMemoryFilteredPhraseStore::default();
        let spam = Phrase::parse_default("spam phrase").unwrap();
        assert!(!store.contains(&spam).await.unwrap());
        store.add(&spam, "abuse", Utc::now()).await.unwrap();
        assert!(store.contains(&spam).await.unwrap());
        store.remove(&spam).await.unwrap();
        assert!(!store.contains(&spam).await.unwrap());
    }
}
