// crates/server/src/suggest.rs
//! The read-path contract from spec §4.3: `suggest(prefix, options) ->
//! Suggestion[]`. Orchestrates the cache, the breaker-wrapped trie lookup,
//! ranking, and fuzzy expansion.

use crate::fuzzy::{bounded_distance, generate_variations};
use crate::state::AppState;
use std::collections::HashSet;
use std::convert::Infallible;
use typeahead_ranking::{rank, RankOptions, TrendingLookup};
use typeahead_trie::Trie;
use typeahead_types::{normalize_phrase, Phrase, Suggestion};

const DEFAULT_LIMIT: usize = 5;

pub struct SuggestOptions<'a> {
    pub user_id: Option<&'a str>,
    pub limit: usize,
    pub skip_cache: bool,
    pub allow_fuzzy: bool,
    pub max_edit_distance: usize,
}

impl<'a> SuggestOptions<'a> {
    pub fn new(user_id: Option<&'a str>) -> Self {
        Self {
            user_id,
            limit: DEFAULT_LIMIT,
            skip_cache: false,
            allow_fuzzy: true,
            max_edit_distance: 2,
        }
    }

    /// Clamp `limit` to `[1, top_k]`, per spec §6 "`limit` is clamped to [1, K]".
    pub fn clamp_limit(mut self, top_k: usize) -> Self {
        self.limit = self.limit.clamp(1, top_k.max(1));
        self
    }
}

pub struct SuggestResult {
    pub suggestions: Vec<Suggestion>,
    pub cache_hit: bool,
}

/// Adapts `Aggregator::trending_score` (keyed by `Phrase`) to the ranking
/// crate's string-keyed lookup trait.
struct TrendingAdapter<'a> {
    aggregator: &'a typeahead_aggregator::Aggregator,
    max_phrase_len: usize,
}

impl<'a> TrendingLookup for TrendingAdapter<'a> {
    fn trending_score(&self, phrase: &str) -> Option<f64> {
        let parsed = Phrase::parse(phrase, self.max_phrase_len).ok()?;
        self.aggregator.trending_score(&parsed)
    }
}

fn popular_fallback(snapshot: &Trie) -> Vec<Suggestion> {
    snapshot.lookup("")
}

/// Covers both spec §4.3 branches: an empty/whitespace prefix normalizes to
/// `""`, which collapses naturally onto the same fixed cache key and a
/// trie lookup that returns the root top-k — no separate code path needed.
pub async fn suggest(state: &AppState, prefix: &str, options: SuggestOptions<'_>) -> SuggestResult {
    let normalized = normalize_phrase(prefix);
    let top_k = state.trie.snapshot().top_k_param();
    let options = options.clamp_limit(top_k);

    if !options.skip_cache {
        if let Some(cached) = state.suggestion_cache.get(&normalized) {
            typeahead_observability::record_cache_operation("suggestion", "hit");
            let ranked = apply_ranking(state, cached, &options);
            return SuggestResult {
                suggestions: finalize(state, &normalized, ranked, &options).await,
                cache_hit: true,
            };
        }
        typeahead_observability::record_cache_operation("suggestion", "miss");
    }

    let raw = lookup_through_breaker(state, &normalized).await;
    state.suggestion_cache.put(&normalized, raw.clone());

    let ranked = apply_ranking(state, raw, &options);
    SuggestResult {
        suggestions: finalize(state, &normalized, ranked, &options).await,
        cache_hit: false,
    }
}

async fn lookup_through_breaker(state: &AppState, normalized: &str) -> Vec<Suggestion> {
    let snapshot = state.trie.snapshot();
    let fallback_snapshot = snapshot.clone();
    let prefix_owned = normalized.to_string();

    state
        .breakers
        .suggestion_service
        .call_with_fallback(
            move || {
                let snapshot = snapshot.clone();
                async move { Ok::<_, Infallible>(snapshot.lookup(&prefix_owned)) }
            },
            move || popular_fallback(&fallback_snapshot),
        )
        .await
}

fn apply_ranking(state: &AppState, candidates: Vec<Suggestion>, options: &SuggestOptions<'_>) -> Vec<Suggestion> {
    let trending = TrendingAdapter {
        aggregator: state.aggregator.as_ref(),
        max_phrase_len: state.config.max_phrase_len,
    };
    let rank_options = RankOptions::new(options.user_id);
    rank(candidates, &rank_options, &trending, &state.personalization)
}

/// Fuzzy-expand if the ranked result is short of `limit`, then truncate.
async fn finalize(
    state: &AppState,
    normalized: &str,
    mut ranked: Vec<Suggestion>,
    options: &SuggestOptions<'_>,
) -> Vec<Suggestion> {
    if ranked.len() < options.limit && options.allow_fuzzy && !normalized.is_empty() {
        let mut seen: HashSet<String> = ranked.iter().map(|s| s.phrase.as_str().to_string()).collect();
        let mut fuzzy_candidates = Vec::new();

        for variation in generate_variations(normalized) {
            let results = lookup_through_breaker(state, &variation).await;
            for mut candidate in results {
                let phrase = candidate.phrase.as_str().to_string();
                if seen.contains(&phrase) {
                    continue;
                }
                let distance = bounded_distance(normalized, &phrase, options.max_edit_distance);
                if distance == 0 || distance > options.max_edit_distance {
                    continue;
                }
                candidate.is_fuzzy = true;
                candidate.edit_distance = Some(distance);
                seen.insert(phrase);
                fuzzy_candidates.push(candidate);
            }
        }

        if !fuzzy_candidates.is_empty() {
            let ranked_fuzzy = apply_ranking(state, fuzzy_candidates, options);
            ranked.extend(ranked_fuzzy);
            ranked.sort_by(|a, b| {
                a.is_fuzzy.cmp(&b.is_fuzzy).then_with(|| {
                    b.score
                        .unwrap_or(0.0)
                        .partial_cmp(&a.score.unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            });
        }
    }

    ranked.truncate(options.limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Arc;
    use typeahead_aggregator::{
        Aggregator, AggregatorConfig, InMemoryFilteredPhraseStore, InMemoryPhraseCountStore,
        InMemoryQueryLogSink,
    };
    use typeahead_db::Database;
    use typeahead_resilience::{BreakerConfig, BreakerRegistry, CircuitBreaker};
    use typeahead_trie::SharedTrie;

    async fn test_state() -> Arc<AppState> {
        let trie = Arc::new(SharedTrie::new(Trie::with_defaults()));
        trie.batch_update(|t| {
            t.insert("search engine", 100).unwrap();
            t.insert("search bar", 50).unwrap();
            t.insert("sea turtle", 10).unwrap();
        });

        let breaker = Arc::new(CircuitBreaker::new(
            "database",
            BreakerConfig {
                timeout_ms: 1_000,
                error_threshold_pct: 50,
                volume_threshold: 5,
                reset_timeout_ms: 15_000,
            },
        ));
        let aggregator = Arc::new(Aggregator::new(
            trie.clone(),
            Arc::new(InMemoryPhraseCountStore::default()),
            Arc::new(InMemoryQueryLogSink::default()),
            Arc::new(InMemoryFilteredPhraseStore::default()),
            breaker,
            AggregatorConfig::default(),
        ));
        let breakers = Arc::new(BreakerRegistry::with_defaults());
        let db = Database::new_in_memory().await.unwrap();

        AppState::new(Config::default(), db, trie, aggregator, breakers)
    }

    #[tokio::test]
    async fn exact_prefix_returns_ranked_matches() {
        let state = test_state().await;
        let result = suggest(&state, "s", SuggestOptions::new(None)).await;
        assert!(!result.cache_hit);
        assert_eq!(result.suggestions[0].phrase.as_str(), "search engine");
    }

    #[tokio::test]
    async fn second_lookup_is_a_cache_hit() {
        let state = test_state().await;
        let _ = suggest(&state, "s", SuggestOptions::new(None)).await;
        let second = suggest(&state, "s", SuggestOptions::new(None)).await;
        assert!(second.cache_hit);
    }

    #[tokio::test]
    async fn empty_prefix_returns_root_popular() {
        let state = test_state().await;
        let result = suggest(&state, "", SuggestOptions::new(None)).await;
        assert_eq!(result.suggestions[0].phrase.as_str(), "search engine");
    }

    #[tokio::test]
    async fn limit_is_respected() {
        let state = test_state().await;
        let mut options = SuggestOptions::new(None);
        options.limit = 1;
        let result = suggest(&state, "s", options).await;
        assert_eq!(result.suggestions.len(), 1);
    }

    #[tokio::test]
    async fn fuzzy_expansion_fills_in_when_exact_matches_are_short() {
        let state = test_state().await;
        let mut options = SuggestOptions::new(None);
        options.limit = 5;
        // "saa turtle" is one substitution away from "sea turtle".
        let result = suggest(&state, "saa turtle", options).await;
        assert!(result.suggestions.iter().any(|s| s.phrase.as_str() == "sea turtle" && s.is_fuzzy));
    }
}
