// crates/types/src/lib.rs
//! Shared data model for the typeahead suggestion core.
//!
//! Kept deliberately free of I/O and business logic — `typeahead-trie`,
//! `typeahead-aggregator`, `typeahead-ranking`, `typeahead-db` and
//! `typeahead-server` all build on these types without depending on each
//! other's internals.

pub mod normalize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use normalize::normalize_phrase;

/// Minimum and maximum accepted length (in chars) of a normalized phrase.
pub const MIN_PHRASE_LEN: usize = 2;
pub const DEFAULT_MAX_PHRASE_LEN: usize = 100;

/// Default number of cached completions held at every trie node.
pub const DEFAULT_TOP_K: usize = 10;

/// A normalized, length-bounded, lowercased phrase.
///
/// Two phrases are equal iff their normal forms are byte-equal. Construct via
/// [`Phrase::parse`] to get normalization and length validation for free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Phrase(String);

/// Why a candidate phrase was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhraseError {
    #[error("phrase shorter than {MIN_PHRASE_LEN} characters after normalization")]
    TooShort,
    #[error("phrase longer than the configured maximum")]
    TooLong,
    #[error("phrase contains no printable characters")]
    Empty,
}

impl Phrase {
    /// Normalize `raw` (NFKC + simple case fold, trim) and validate its length
    /// against `max_len`. This is the single entry point every component
    /// (insert, increment, lookup, filter checks) must go through so that
    /// normalization stays consistent across the system.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, PhraseError> {
        let normalized = normalize_phrase(raw);
        if normalized.is_empty() {
            return Err(PhraseError::Empty);
        }
        let len = normalized.chars().count();
        if len < MIN_PHRASE_LEN {
            return Err(PhraseError::TooShort);
        }
        if len > max_len {
            return Err(PhraseError::TooLong);
        }
        Ok(Self(normalized))
    }

    /// Parse using the default maximum length (100 chars).
    pub fn parse_default(raw: &str) -> Result<Self, PhraseError> {
        Self::parse(raw, DEFAULT_MAX_PHRASE_LEN)
    }

    /// Construct from an already-normalized string without re-validating.
    /// Used when round-tripping from a trusted durable store.
    pub fn from_normalized_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn chars(&self) -> std::str::Chars<'_> {
        self.0.chars()
    }

    pub fn len_chars(&self) -> usize {
        self.0.chars().count()
    }
}

impl std::fmt::Display for Phrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Phrase {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A persisted count for a phrase, as stored in the durable phrase-count
/// store and carried by trie nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseCount {
    pub phrase: Phrase,
    pub count: u64,
    pub last_updated: DateTime<Utc>,
}

impl PhraseCount {
    pub fn new(phrase: Phrase, count: u64, last_updated: DateTime<Utc>) -> Self {
        Self {
            phrase,
            count,
            last_updated,
        }
    }
}

/// Ordering used for `top_k` and ranking ties: count desc, then
/// `last_updated` desc, then phrase lexicographic asc.
pub fn topk_cmp(a: &PhraseCount, b: &PhraseCount) -> std::cmp::Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.last_updated.cmp(&a.last_updated))
        .then_with(|| a.phrase.cmp(&b.phrase))
}

/// A candidate returned from the suggestion read path. The trie only ever
/// produces the persistent fields (`phrase`, `count`, `last_updated`);
/// `score`, `is_fuzzy`, `edit_distance` and `fuzzy_penalty` are attached
/// during ranking in `typeahead-server`/`typeahead-ranking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub phrase: Phrase,
    pub count: u64,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub is_fuzzy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_distance: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_penalty: Option<f64>,
}

impl Suggestion {
    /// Build a bare suggestion carrying only persistent fields (what the
    /// trie returns before ranking touches it).
    pub fn from_phrase_count(pc: PhraseCount) -> Self {
        Self {
            phrase: pc.phrase,
            count: pc.count,
            last_updated: pc.last_updated,
            score: None,
            is_fuzzy: false,
            edit_distance: None,
            fuzzy_penalty: None,
        }
    }

    pub fn as_phrase_count(&self) -> PhraseCount {
        PhraseCount {
            phrase: self.phrase.clone(),
            count: self.count,
            last_updated: self.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_short_phrase() {
        assert_eq!(Phrase::parse_default("a"), Err(PhraseError::TooShort));
    }

    #[test]
    fn parse_rejects_long_phrase() {
        let long = "a".repeat(101);
        assert_eq!(Phrase::parse_default(&long), Err(PhraseError::TooLong));
    }

    #[test]
    fn parse_accepts_boundary_length() {
        let exact = "a".repeat(100);
        assert!(Phrase::parse_default(&exact).is_ok());
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let p = Phrase::parse_default("  Search Engine  ").unwrap();
        assert_eq!(p.as_str(), "search engine");
    }

    #[test]
    fn topk_cmp_orders_by_count_then_recency_then_lex() {
        let now = Utc::now();
        let a = PhraseCount::new(Phrase::parse_default("alpha").unwrap(), 10, now);
        let b = PhraseCount::new(Phrase::parse_default("beta").unwrap(), 10, now);
        // Same count and timestamp: lexicographic ascending means `a` ranks first.
        let mut v = vec![b.clone(), a.clone()];
        v.sort_by(topk_cmp);
        assert_eq!(v[0].phrase, a.phrase);
    }
}
