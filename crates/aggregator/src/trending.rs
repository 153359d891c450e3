// crates/aggregator/src/trending.rs
//! Sliding 5-minute bucket history used to derive a time-decayed
//! `TrendingScore` per phrase, distinct from the trie's all-time `count`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use typeahead_types::Phrase;

const BUCKET_WIDTH_MINUTES: i64 = 5;
const MAX_BUCKETS: usize = 12;
const TRENDING_WEIGHT_DECAY: f64 = 0.9;
const HOURLY_DECAY: f64 = 0.9;
const TRENDING_FLOOR: f64 = 0.1;

struct Bucket {
    start: DateTime<Utc>,
    counts: HashMap<Phrase, u64>,
}

impl Bucket {
    fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            counts: HashMap::new(),
        }
    }
}

/// Tracks per-phrase activity in rolling 5-minute buckets and derives a
/// `trending` score map from the most recent [`MAX_BUCKETS`] of them.
pub struct TrendingTracker {
    current: Bucket,
    history: VecDeque<Bucket>,
    trending: HashMap<Phrase, f64>,
}

impl Default for TrendingTracker {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl TrendingTracker {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current: Bucket::starting_at(now),
            history: VecDeque::with_capacity(MAX_BUCKETS),
            trending: HashMap::new(),
        }
    }

    /// Roll the current bucket into history if its window has elapsed,
    /// then record one occurrence of `phrase` in the (possibly new) current
    /// bucket.
    pub fn record(&mut self, phrase: &Phrase, now: DateTime<Utc>) {
        self.roll_if_elapsed(now);
        *self.current.counts.entry(phrase.clone()).or_insert(0) += 1;
    }

    fn roll_if_elapsed(&mut self, now: DateTime<Utc>) {
        let width = ChronoDuration::minutes(BUCKET_WIDTH_MINUTES);
        if now - self.current.start >= width {
            let closed = std::mem::replace(&mut self.current, Bucket::starting_at(now));
            self.history.push_front(closed);
            while self.history.len() > MAX_BUCKETS - 1 {
                self.history.pop_back();
            }
        }
    }

    /// Recompute the `trending` mapping as a weighted union of the current
    /// bucket plus up to `MAX_BUCKETS - 1` historical buckets, weight
    /// `0.9^i` with the current bucket at `i = 0`.
    pub fn aggregate(&mut self) {
        let mut trending: HashMap<Phrase, f64> = HashMap::new();
        for (i, bucket) in std::iter::once(&self.current)
            .chain(self.history.iter())
            .take(MAX_BUCKETS)
            .enumerate()
        {
            let weight = TRENDING_WEIGHT_DECAY.powi(i as i32);
            for (phrase, count) in &bucket.counts {
                *trending.entry(phrase.clone()).or_insert(0.0) += weight * (*count as f64);
            }
        }
        self.trending = trending;
    }

    /// Hourly decay: scores shrink geometrically and vanish below the floor.
    pub fn decay(&mut self) {
        self.trending.retain(|_, score| {
            *score *= HOURLY_DECAY;
            *score >= TRENDING_FLOOR
        });
    }

    pub fn score(&self, phrase: &Phrase) -> Option<f64> {
        self.trending.get(phrase).copied()
    }
}
