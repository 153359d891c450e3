// crates/server/src/cache.rs
//! Suggestion cache per spec §4.3 "Cache layer": keyed by normalized
//! prefix, stores the raw (unranked) trie result, fixed TTL, with whole-
//! cache and pattern invalidation hooks for `rebuild_trie`/`clear_cache`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use typeahead_types::Suggestion;

struct Entry {
    value: Vec<Suggestion>,
    stored_at: Instant,
}

pub struct SuggestionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<Suggestion>> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: &str, value: Vec<Suggestion>) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every cached entry, used after `rebuild_trie` since every
    /// cached prefix may now return different candidates.
    pub fn clear_all(&self) {
        self.entries.lock().clear();
    }

    /// Drop entries whose key starts with `pattern`. An empty pattern
    /// clears everything, matching `clear_all`.
    pub fn clear_pattern(&self, pattern: &str) {
        if pattern.is_empty() {
            self.clear_all();
            return;
        }
        self.entries.lock().retain(|key, _| !key.starts_with(pattern));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use typeahead_types::Phrase;

    fn suggestion(phrase: &str) -> Suggestion {
        Suggestion::from_phrase_count(typeahead_types::PhraseCount::new(
            Phrase::parse_default(phrase).unwrap(),
            1,
            Utc::now(),
        ))
    }

    #[test]
    fn get_returns_none_before_any_put() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        assert!(cache.get("sea").is_none());
    }

    #[test]
    fn put_then_get_round_trips_within_ttl() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.put("sea", vec![suggestion("sea turtle")]);
        let hit = cache.get("sea").unwrap();
        assert_eq!(hit[0].phrase.as_str(), "sea turtle");
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = SuggestionCache::new(Duration::from_millis(10));
        cache.put("sea", vec![suggestion("sea turtle")]);
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("sea").is_none());
    }

    #[test]
    fn clear_all_drops_every_entry() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.put("sea", vec![suggestion("sea turtle")]);
        cache.put("search", vec![suggestion("search engine")]);
        cache.clear_all();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn clear_pattern_only_drops_matching_prefixes() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.put("sea", vec![suggestion("sea turtle")]);
        cache.put("search", vec![suggestion("search engine")]);
        cache.clear_pattern("sea");
        // "sea" and "search" both start with "sea" so both are cleared.
        assert_eq!(cache.len(), 0);

        cache.put("sea", vec![suggestion("sea turtle")]);
        cache.put("bar", vec![suggestion("bar stool")]);
        cache.clear_pattern("sea");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("bar").is_some());
    }
}
