// crates/server/src/personalization.rs
//! In-memory per-user phrase affinity store backing
//! `typeahead_ranking::PersonalizationLookup`. Spec §4.4 leaves the store
//! itself unspecified beyond "phrase -> affinity in [0, 1]"; ML training of
//! these affinities is an explicit Non-goal, so this is a plain settable
//! map, not a learned model.

use parking_lot::RwLock;
use std::collections::HashMap;
use typeahead_ranking::PersonalizationLookup;

#[derive(Default)]
pub struct PersonalizationStore {
    affinities: RwLock<HashMap<String, HashMap<String, f64>>>,
}

impl PersonalizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `user_id`'s affinity for `phrase`, clamped to `[0, 1]`.
    pub fn set_affinity(&self, user_id: &str, phrase: &str, affinity: f64) {
        let clamped = affinity.clamp(0.0, 1.0);
        self.affinities
            .write()
            .entry(user_id.to_string())
            .or_default()
            .insert(phrase.to_string(), clamped);
    }
}

impl PersonalizationLookup for PersonalizationStore {
    fn affinity(&self, user_id: &str, phrase: &str) -> Option<f64> {
        self.affinities.read().get(user_id)?.get(phrase).copied()
    }
}
