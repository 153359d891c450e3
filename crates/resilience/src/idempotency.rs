// crates/resilience/src/idempotency.rs
//! Idempotency key derivation and a short-lived response cache, so that a
//! retried write (e.g. `add_filter`) replays the original response instead
//! of re-applying the operation.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Derives a stable key from an operation name and its canonical request
/// body. Truncated to 32 hex chars — collision risk is irrelevant at this
/// scale and a short key keeps log lines readable.
pub fn derive_key(operation: &str, canonical_body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b":");
    hasher.update(canonical_body.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..32].to_string()
}

struct Entry<T> {
    response: T,
    stored_at: Instant,
}

struct LockEntry {
    acquired_at: Instant,
}

/// In-memory idempotency store. A single-process deployment only needs the
/// map below; a multi-instance deployment would back this with a
/// CAS-capable store (e.g. Redis `SET NX`) behind the same interface, which
/// is why acquire/release are modeled as an explicit lock step rather than
/// folded into `record`.
pub struct IdempotencyStore<T: Clone> {
    ttl: Duration,
    lock_ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
    locks: Mutex<HashMap<String, LockEntry>>,
}

impl<T: Clone> IdempotencyStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            lock_ttl: Duration::from_secs(30),
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the previously recorded response for `key`, if present and
    /// not yet expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.response.clone());
            }
            entries.remove(key);
        }
        None
    }

    pub fn record(&self, key: &str, response: T) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
    }

    /// Attempt to claim `key` for in-flight processing. Returns `true` if
    /// the caller now owns the lock (no concurrent holder, or the previous
    /// holder's lock expired). A second concurrent request for the same key
    /// should instead poll `get` until the first request's result appears.
    pub fn try_acquire_lock(&self, key: &str) -> bool {
        let mut locks = self.locks.lock();
        if let Some(existing) = locks.get(key) {
            if existing.acquired_at.elapsed() < self.lock_ttl {
                return false;
            }
        }
        locks.insert(
            key.to_string(),
            LockEntry {
                acquired_at: Instant::now(),
            },
        );
        true
    }

    pub fn release_lock(&self, key: &str) {
        self.locks.lock().remove(key);
    }
}
