// crates/trie/src/lib.rs
//! Prefix index with per-node cached top-k completions.
//!
//! A lookup walks exactly `|prefix|` edges and returns a pre-sorted,
//! pre-truncated list — the expensive part (choosing the K best phrases
//! under a node) is paid once per write, not once per read.

mod node;
mod shared;
mod snapshot;

pub use shared::SharedTrie;
pub use snapshot::TrieSnapshotError;

use chrono::{DateTime, Utc};
use node::TrieNode;
use std::collections::HashMap;
use thiserror::Error;
use typeahead_types::{normalize_phrase, Phrase, PhraseCount, PhraseError, Suggestion};

/// Errors an operation can reject with. The trie never partially mutates
/// its state on one of these — validation happens before any node is
/// touched.
#[derive(Debug, Error, PartialEq)]
pub enum TrieError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] PhraseError),
}

/// Summary statistics computed by a full DFS over the trie.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TrieStats {
    pub phrase_count: usize,
    pub node_count: usize,
    pub max_depth: usize,
    pub top_k: usize,
}

/// The prefix index itself. Single-writer, many-reader: callers that need
/// concurrent access should wrap this in [`SharedTrie`] rather than sharing
/// a `Trie` directly.
#[derive(Debug, Clone)]
pub struct Trie {
    root: TrieNode,
    size: usize,
    top_k: usize,
    max_phrase_len: usize,
    /// Auxiliary cache mapping each indexed phrase to its current count, so
    /// `has`/`count` don't need a trie walk. Must stay in sync with the
    /// terminal nodes it mirrors.
    phrase_index: HashMap<Phrase, PhraseCount>,
}

impl Trie {
    /// Construct an empty trie with the given top-k cap and maximum phrase
    /// length (chars, after normalization).
    pub fn new(top_k: usize, max_phrase_len: usize) -> Self {
        Self {
            root: TrieNode::default(),
            size: 0,
            top_k,
            max_phrase_len,
            phrase_index: HashMap::new(),
        }
    }

    /// Construct with the spec defaults (`top_k = 10`, `max_phrase_len = 100`).
    pub fn with_defaults() -> Self {
        Self::new(
            typeahead_types::DEFAULT_TOP_K,
            typeahead_types::DEFAULT_MAX_PHRASE_LEN,
        )
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn top_k_param(&self) -> usize {
        self.top_k
    }

    pub fn max_phrase_len(&self) -> usize {
        self.max_phrase_len
    }

    /// Current count for `phrase`, if indexed.
    pub fn count(&self, raw_phrase: &str) -> Option<u64> {
        let phrase = Phrase::parse(raw_phrase, self.max_phrase_len).ok()?;
        self.phrase_index.get(&phrase).map(|pc| pc.count)
    }

    pub fn has(&self, raw_phrase: &str) -> bool {
        match Phrase::parse(raw_phrase, self.max_phrase_len) {
            Ok(phrase) => self.phrase_index.contains_key(&phrase),
            Err(_) => false,
        }
    }

    /// Insert or overwrite `phrase` with an absolute `count`. Increments
    /// `size` only if the phrase was not previously present.
    pub fn insert(&mut self, raw_phrase: &str, count: u64) -> Result<(), TrieError> {
        self.insert_at(raw_phrase, count, Utc::now())
    }

    /// Insert with an explicit timestamp — used by tests and by
    /// `deserialize` to faithfully restore `last_updated`.
    pub fn insert_at(
        &mut self,
        raw_phrase: &str,
        count: u64,
        now: DateTime<Utc>,
    ) -> Result<(), TrieError> {
        let phrase = Phrase::parse(raw_phrase, self.max_phrase_len)?;
        let is_new = !self.phrase_index.contains_key(&phrase);

        let candidate = PhraseCount::new(phrase.clone(), count, now);
        let chars: Vec<char> = phrase.chars().collect();
        self.root.insert_path(&chars, 0, &candidate, self.top_k);

        self.phrase_index.insert(phrase, candidate);
        if is_new {
            self.size += 1;
        }
        Ok(())
    }

    /// `insert(phrase, get_count(phrase) + delta)`. `delta` must be positive;
    /// negative deltas are not supported (rebuild instead).
    pub fn increment(&mut self, raw_phrase: &str, delta: u64) -> Result<u64, TrieError> {
        self.increment_at(raw_phrase, delta, Utc::now())
    }

    pub fn increment_at(
        &mut self,
        raw_phrase: &str,
        delta: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, TrieError> {
        let current = self.count(raw_phrase).unwrap_or(0);
        let new_count = current + delta;
        self.insert_at(raw_phrase, new_count, now)?;
        Ok(new_count)
    }

    /// Lookup the cached top-k completions under `prefix`. An empty prefix
    /// returns the root's top-k (global popularity). A prefix with no
    /// matching edge returns an empty list — never an error.
    pub fn lookup(&self, prefix: &str) -> Vec<Suggestion> {
        let normalized = normalize_phrase(prefix);
        let chars: Vec<char> = normalized.chars().collect();
        match self.root.walk(&chars, 0) {
            Some(node) => node
                .top_k
                .iter()
                .cloned()
                .map(Suggestion::from_phrase_count)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Remove `phrase` if present. Re-heals every ancestor's `top_k` from
    /// its children so the invariant holds after the removal (the source
    /// behavior of only dropping the removed entry is explicitly rejected
    /// by the spec's Open Question resolution — see DESIGN.md).
    pub fn remove(&mut self, raw_phrase: &str) -> bool {
        let phrase = match Phrase::parse(raw_phrase, self.max_phrase_len) {
            Ok(p) => p,
            Err(_) => return false,
        };
        if !self.phrase_index.contains_key(&phrase) {
            return false;
        }
        let chars: Vec<char> = phrase.chars().collect();
        let removed = self.root.remove_path(&chars, 0, self.top_k);
        if removed {
            self.phrase_index.remove(&phrase);
            self.size -= 1;
        }
        removed
    }

    /// Build a fresh trie from `(phrase, count)` pairs. Callers that need
    /// the atomic-swap semantics described in the spec should build with
    /// this and then hand the result to [`SharedTrie::replace`].
    pub fn rebuild<I>(top_k: usize, max_phrase_len: usize, source: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut trie = Self::new(top_k, max_phrase_len);
        let now = Utc::now();
        for (phrase, count) in source {
            // Malformed entries from a durable store are skipped rather than
            // aborting the whole rebuild.
            let _ = trie.insert_at(&phrase, count, now);
        }
        trie
    }

    pub fn serialize(&self) -> Result<Vec<u8>, snapshot::TrieSnapshotError> {
        snapshot::serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, snapshot::TrieSnapshotError> {
        snapshot::deserialize(bytes)
    }

    pub fn stats(&self) -> TrieStats {
        let (node_count, max_depth) = self.root.dfs_stats(0);
        TrieStats {
            phrase_count: self.size,
            node_count,
            max_depth,
            top_k: self.top_k,
        }
    }
}
