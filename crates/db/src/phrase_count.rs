// crates/db/src/phrase_count.rs
//! sqlx-backed `PhraseCountStore`: the `(phrase, count, last_updated,
//! is_filtered)` table spec §6 calls for, and the `top_phrases` query
//! `rebuild_trie` reads from.

use crate::{Database, DbError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use typeahead_aggregator::{PhraseCountStore, StoreError};
use typeahead_types::Phrase;

fn to_store_error(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl Database {
    /// Current count for `phrase`, or `None` if never observed.
    pub async fn get_phrase_count(&self, phrase: &Phrase) -> Result<Option<u64>, DbError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT count FROM phrase_counts WHERE phrase = ?")
            .bind(phrase.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|(count,)| count as u64))
    }
}

#[async_trait]
impl PhraseCountStore for Database {
    async fn upsert(
        &self,
        phrase: &Phrase,
        count_delta: u64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO phrase_counts (phrase, count, last_updated, is_filtered)
            VALUES (?1, ?2, ?3, 0)
            ON CONFLICT(phrase) DO UPDATE SET
                count = phrase_counts.count + excluded.count,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(phrase.as_str())
        .bind(count_delta as i64)
        .bind(now.timestamp())
        .execute(self.pool())
        .await
        .map_err(to_store_error)?;
        Ok(())
    }

    async fn top_phrases(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT phrase, count FROM phrase_counts
            WHERE is_filtered = 0
            ORDER BY count DESC, phrase ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await
        .map_err(to_store_error)?;

        Ok(rows
            .into_iter()
            .map(|(phrase, count)| (phrase, count as u64))
            .collect())
    }
}

/// Mark/unmark `phrase` as filtered in the denormalized `is_filtered`
/// column, kept in sync by `add_filter`/`remove_filter`. A no-op if the
/// phrase hasn't been counted yet — `filtered_phrases` remains the
/// authoritative source either way (see `filtered_phrase.rs`).
impl Database {
    pub(crate) async fn set_phrase_filtered(&self, phrase: &Phrase, filtered: bool) -> Result<(), DbError> {
        sqlx::query("UPDATE phrase_counts SET is_filtered = ? WHERE phrase = ?")
            .bind(filtered)
            .bind(phrase.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
