// crates/ranking/src/lib.rs
//! Pure scoring function for candidate suggestions. `rank` never fails: on
//! missing trending/personalization data it simply omits that adjustment,
//! because a ranking hiccup must never turn into a suggestion-service
//! error (see the read path's degrade-gracefully policy).

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use typeahead_types::Suggestion;

const TAU_RECENCY_DAYS: f64 = 7.0;
const RECENCY_WEIGHT_FACTOR: f64 = 0.25;
const TRENDING_WEIGHT: f64 = 5.0;
const PERSONAL_WEIGHT_FACTOR: f64 = 2.0;
const FUZZY_PENALTY_PER_DISTANCE: f64 = 0.2;

/// Read-only views into the trending and personalization stores, passed in
/// by the caller so this crate stays free of I/O. Returning `None` for a
/// phrase means "no data", not "zero" — `rank` treats both the same way
/// (the adjustment is simply skipped), but keeping the distinction lets
/// callers reuse the same trait for a cache that can be cold.
pub trait TrendingLookup {
    fn trending_score(&self, phrase: &str) -> Option<f64>;
}

pub trait PersonalizationLookup {
    fn affinity(&self, user_id: &str, phrase: &str) -> Option<f64>;
}

impl<F: Fn(&str) -> Option<f64>> TrendingLookup for F {
    fn trending_score(&self, phrase: &str) -> Option<f64> {
        self(phrase)
    }
}

pub struct RankOptions<'a> {
    pub user_id: Option<&'a str>,
    pub now: DateTime<Utc>,
}

impl<'a> RankOptions<'a> {
    pub fn new(user_id: Option<&'a str>) -> Self {
        Self {
            user_id,
            now: Utc::now(),
        }
    }
}

fn percentile_95(counts: &[u64]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<u64> = counts.to_vec();
    sorted.sort_unstable();
    let idx = ((sorted.len() as f64 - 1.0) * 0.95).round() as usize;
    sorted[idx.min(sorted.len() - 1)] as f64
}

/// Score and sort `candidates` in place-equivalent fashion, returning a new
/// ranked vector. `candidates` carry `is_fuzzy`/`fuzzy_penalty` (edit
/// distance) metadata already attached by the caller; this function adds
/// the recency/trending/personalization/fuzzy adjustments and sorts.
pub fn rank(
    candidates: Vec<Suggestion>,
    options: &RankOptions<'_>,
    trending: &dyn TrendingLookup,
    personalization: &dyn PersonalizationLookup,
) -> Vec<Suggestion> {
    let counts: Vec<u64> = candidates.iter().map(|c| c.count).collect();
    let p95 = percentile_95(&counts);
    let recency_weight = RECENCY_WEIGHT_FACTOR * p95;
    let personal_weight = PERSONAL_WEIGHT_FACTOR * p95;

    let mut ranked: Vec<Suggestion> = candidates
        .into_iter()
        .map(|mut candidate| {
            let mut score = candidate.count as f64;

            let age_days = (options.now - candidate.last_updated)
                .num_milliseconds()
                .max(0) as f64
                / (1000.0 * 60.0 * 60.0 * 24.0);
            score += recency_weight * (-age_days / TAU_RECENCY_DAYS).exp();

            if let Some(trend) = trending.trending_score(candidate.phrase.as_str()) {
                if trend > 0.0 {
                    score += TRENDING_WEIGHT * (1.0 + trend).ln();
                }
            }

            if let Some(user_id) = options.user_id {
                let affinity = personalization
                    .affinity(user_id, candidate.phrase.as_str())
                    .unwrap_or(0.0);
                score += personal_weight * affinity;
            }

            if candidate.is_fuzzy {
                let distance = candidate.edit_distance.unwrap_or(0);
                let penalty = FUZZY_PENALTY_PER_DISTANCE * distance as f64;
                candidate.fuzzy_penalty = Some(penalty);
                score *= 1.0 - penalty.min(1.0);
            }

            candidate.score = Some(score);
            candidate
        })
        .collect();

    ranked.sort_by(|a, b| compare_ranked(a, b));
    ranked
}

fn compare_ranked(a: &Suggestion, b: &Suggestion) -> Ordering {
    // Exact matches before fuzzy, then score desc, then recency desc, then lex.
    a.is_fuzzy
        .cmp(&b.is_fuzzy)
        .then_with(|| {
            b.score
                .unwrap_or(0.0)
                .partial_cmp(&a.score.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.last_updated.cmp(&a.last_updated))
        .then_with(|| a.phrase.cmp(&b.phrase))
}

/// A `TrendingLookup`/`PersonalizationLookup` that always returns `None` —
/// used when the caller has no store wired up (e.g. the root popular-terms
/// path, or a test that doesn't care about these adjustments).
pub struct NoLookup;

impl TrendingLookup for NoLookup {
    fn trending_score(&self, _phrase: &str) -> Option<f64> {
        None
    }
}

impl PersonalizationLookup for NoLookup {
    fn affinity(&self, _user_id: &str, _phrase: &str) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use typeahead_types::Phrase;

    fn suggestion(phrase: &str, count: u64, last_updated: DateTime<Utc>) -> Suggestion {
        Suggestion {
            phrase: Phrase::parse_default(phrase).unwrap(),
            count,
            last_updated,
            score: None,
            is_fuzzy: false,
            edit_distance: None,
            fuzzy_penalty: None,
        }
    }

    #[test]
    fn higher_count_ranks_first_with_no_adjustments() {
        let now = Utc::now();
        let candidates = vec![
            suggestion("search bar", 50, now),
            suggestion("search engine", 100, now),
        ];
        let ranked = rank(candidates, &RankOptions::new(None), &NoLookup, &NoLookup);
        assert_eq!(ranked[0].phrase.as_str(), "search engine");
    }

    #[test]
    fn trending_boost_can_overcome_a_small_count_gap() {
        let now = Utc::now();
        let candidates = vec![
            suggestion("search engine", 100, now),
            suggestion("search trend", 95, now),
        ];
        let trending = |phrase: &str| -> Option<f64> {
            if phrase == "search trend" {
                Some(50.0)
            } else {
                None
            }
        };
        let ranked = rank(candidates, &RankOptions::new(None), &trending, &NoLookup);
        assert_eq!(ranked[0].phrase.as_str(), "search trend");
    }

    #[test]
    fn fuzzy_penalty_reduces_score_and_sorts_after_exact() {
        let now = Utc::now();
        let mut exact = suggestion("search engine", 100, now);
        let mut fuzzy = suggestion("search engines", 100, now);
        fuzzy.is_fuzzy = true;
        fuzzy.edit_distance = Some(1);
        exact.is_fuzzy = false;

        let ranked = rank(vec![fuzzy, exact], &RankOptions::new(None), &NoLookup, &NoLookup);
        assert_eq!(ranked[0].phrase.as_str(), "search engine");
        assert!(!ranked[0].is_fuzzy);
        assert!(ranked[1].is_fuzzy);
    }

    #[test]
    fn scenario_6_fuzzy_penalty_matches_spec_example() {
        let now = Utc::now();
        let mut engine = suggestion("search engine", 100, now);
        engine.is_fuzzy = true;
        engine.edit_distance = Some(1);
        let mut bar = suggestion("search bar", 50, now);
        bar.is_fuzzy = true;
        bar.edit_distance = Some(1);

        let ranked = rank(vec![bar, engine], &RankOptions::new(None), &NoLookup, &NoLookup);
        // 0.2 * distance(1) = 0.2 penalty -> score *= 0.8, preserving relative order.
        assert_eq!(ranked[0].phrase.as_str(), "search engine");
        assert_eq!(ranked[1].phrase.as_str(), "search bar");
        assert_eq!(ranked[0].fuzzy_penalty, Some(0.2));
    }

    #[test]
    fn personalization_boosts_preferred_phrase_for_its_user() {
        let now = Utc::now();
        let candidates = vec![
            suggestion("search engine", 100, now),
            suggestion("search news", 90, now),
        ];
        struct Affinity;
        impl PersonalizationLookup for Affinity {
            fn affinity(&self, user_id: &str, phrase: &str) -> Option<f64> {
                if user_id == "u1" && phrase == "search news" {
                    Some(1.0)
                } else {
                    None
                }
            }
        }
        let ranked = rank(
            candidates,
            &RankOptions::new(Some("u1")),
            &NoLookup,
            &Affinity,
        );
        assert_eq!(ranked[0].phrase.as_str(), "search news");
    }

    #[test]
    fn ties_break_by_recency_then_lexicographic() {
        let now = Utc::now();
        let older = suggestion("alpha", 10, now - Duration::days(1));
        let newer = suggestion("beta", 10, now);
        let ranked = rank(
            vec![older, newer],
            &RankOptions::new(None),
            &NoLookup,
            &NoLookup,
        );
        assert_eq!(ranked[0].phrase.as_str(), "beta");
    }
}
