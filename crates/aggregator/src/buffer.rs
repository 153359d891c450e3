// crates/aggregator/src/buffer.rs
//! The write-side buffer: a high-rate, latency-sensitive intake path writes
//! here; a low-rate flush task drains it. Keyed by normalized phrase so
//! concurrent increments to the same phrase coalesce instead of piling up
//! as separate events.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use typeahead_types::Phrase;

#[derive(Debug, Clone, PartialEq)]
pub struct BufferEntry {
    pub delta: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A snapshot taken at flush time: phrase, accumulated delta, and the
/// freshest timestamp observed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedEntry {
    pub phrase: Phrase,
    pub delta: u64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Default)]
pub struct AggregationBuffer {
    entries: Mutex<HashMap<Phrase, BufferEntry>>,
}

impl AggregationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `phrase` at `now`. Creates the entry with
    /// `delta = 1` if this is the phrase's first appearance since the last
    /// flush.
    pub fn record(&self, phrase: &Phrase, now: DateTime<Utc>) {
        let mut entries = self.entries.lock();
        entries
            .entry(phrase.clone())
            .and_modify(|e| {
                e.delta += 1;
                e.last_seen = now;
            })
            .or_insert(BufferEntry {
                delta: 1,
                first_seen: now,
                last_seen: now,
            });
    }

    /// Atomically take everything accumulated so far, leaving the buffer
    /// empty for the next intake window.
    pub fn drain(&self) -> Vec<FlushedEntry> {
        let mut entries = self.entries.lock();
        let drained = std::mem::take(&mut *entries);
        drained
            .into_iter()
            .map(|(phrase, entry)| FlushedEntry {
                phrase,
                delta: entry.delta,
                last_seen: entry.last_seen,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(s: &str) -> Phrase {
        Phrase::parse_default(s).unwrap()
    }

    #[test]
    fn repeated_records_coalesce_into_one_delta() {
        let buffer = AggregationBuffer::new();
        let now = Utc::now();
        buffer.record(&phrase("search engine"), now);
        buffer.record(&phrase("search engine"), now);
        buffer.record(&phrase("search engine"), now);
        assert_eq!(buffer.len(), 1);

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].delta, 3);
    }

    #[test]
    fn drain_empties_the_buffer() {
        let buffer = AggregationBuffer::new();
        buffer.record(&phrase("search engine"), Utc::now());
        assert!(!buffer.is_empty());
        buffer.drain();
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn distinct_phrases_are_tracked_independently() {
        let buffer = AggregationBuffer::new();
        let now = Utc::now();
        buffer.record(&phrase("search engine"), now);
        buffer.record(&phrase("sea turtle"), now);
        assert_eq!(buffer.len(), 2);
    }
}
