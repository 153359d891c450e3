// crates/trie/src/snapshot.rs
//! Stable serialize/deserialize encoding: `(top_k parameter, max_phrase_len,
//! size, list of (phrase, count, last_updated))`. Node-level `top_k` lists
//! are not encoded — they are deterministically rebuilt from the entry list
//! on `deserialize`, which also exercises the same invariant-preserving
//! insert path as a live `rebuild`.

use crate::Trie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieSnapshotError {
    #[error("failed to encode trie snapshot: {0}")]
    Encode(String),
    #[error("failed to decode trie snapshot: {0}")]
    Decode(String),
}

#[derive(Serialize, Deserialize)]
struct TrieSnapshot {
    top_k: usize,
    max_phrase_len: usize,
    size: usize,
    entries: Vec<(String, u64, DateTime<Utc>)>,
}

pub(crate) fn serialize(trie: &Trie) -> Result<Vec<u8>, TrieSnapshotError> {
    let mut entries: Vec<(String, u64, DateTime<Utc>)> = trie
        .phrase_index
        .values()
        .map(|pc| (pc.phrase.as_str().to_string(), pc.count, pc.last_updated))
        .collect();
    // Stable ordering so identical tries produce identical bytes.
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let snapshot = TrieSnapshot {
        top_k: trie.top_k,
        max_phrase_len: trie.max_phrase_len,
        size: trie.size,
        entries,
    };
    bincode::serialize(&snapshot).map_err(|e| TrieSnapshotError::Encode(e.to_string()))
}

pub(crate) fn deserialize(bytes: &[u8]) -> Result<Trie, TrieSnapshotError> {
    let snapshot: TrieSnapshot =
        bincode::deserialize(bytes).map_err(|e| TrieSnapshotError::Decode(e.to_string()))?;

    let mut trie = Trie::new(snapshot.top_k, snapshot.max_phrase_len);
    for (phrase, count, last_updated) in snapshot.entries {
        trie.insert_at(&phrase, count, last_updated)
            .map_err(|e| TrieSnapshotError::Decode(e.to_string()))?;
    }
    debug_assert_eq!(trie.size, snapshot.size);
    Ok(trie)
}
