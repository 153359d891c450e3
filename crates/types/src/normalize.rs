// crates/types/src/normalize.rs
//! Unicode-aware normalization shared by insert, increment, lookup, and
//! filter checks (see spec "Design Notes — Normalization").

use unicode_normalization::UnicodeNormalization;

/// NFKC-normalize, simple-case-fold, and trim `raw`. This is applied
/// consistently everywhere a phrase or prefix enters the system so that two
/// visually-identical strings always compare equal.
pub fn normalize_phrase(raw: &str) -> String {
    let nfkc: String = raw.trim().nfkc().collect();
    nfkc.chars().flat_map(char::to_lowercase).collect()
}
