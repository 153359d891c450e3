// crates/db/src/filtered_phrase.rs
//! sqlx-backed `FilteredPhraseStore`: the `(phrase, reason, added_at)`
//! blocklist table. `add`/`remove` also update the denormalized
//! `phrase_counts.is_filtered` column so `top_phrases` stays correct
//! without a join on every rebuild.

use crate::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use typeahead_aggregator::{FilteredPhraseStore, StoreError};
use typeahead_types::Phrase;

fn to_store_error(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl FilteredPhraseStore for Database {
    async fn contains(&self, phrase: &Phrase) -> Result<bool, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT phrase FROM filtered_phrases WHERE phrase = ?")
                .bind(phrase.as_str())
                .fetch_optional(self.pool())
                .await
                .map_err(to_store_error)?;
        Ok(row.is_some())
    }

    async fn add(&self, phrase: &Phrase, reason: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO filtered_phrases (phrase, reason, added_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(phrase) DO UPDATE SET reason = excluded.reason, added_at = excluded.added_at
            "#,
        )
        .bind(phrase.as_str())
        .bind(reason)
        .bind(now.timestamp())
        .execute(self.pool())
        .await
        .map_err(to_store_error)?;

        self.set_phrase_filtered(phrase, true)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, phrase: &Phrase) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM filtered_phrases WHERE phrase = ?")
            .bind(phrase.as_str())
            .execute(self.pool())
            .await
            .map_err(to_store_error)?;

        self.set_phrase_filtered(phrase, false)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Phrase>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT phrase FROM filtered_phrases")
            .fetch_all(self.pool())
            .await
            .map_err(to_store_error)?;
        Ok(rows
            .into_iter()
            .map(|(p,)| Phrase::from_normalized_unchecked(p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeahead_aggregator::PhraseCountStore;

    #[tokio::test]
    async fn add_remove_round_trips_and_syncs_phrase_counts() {
        let db = Database::new_in_memory().await.unwrap();
        let spam = Phrase::parse_default("spam phrase").unwrap();
        let now = Utc::now();

        db.upsert(&spam, 50, now).await.unwrap();
        assert!(!db.contains(&spam).await.unwrap());

        db.add(&spam, "abuse", now).await.unwrap();
        assert!(db.contains(&spam).await.unwrap());
        assert!(db.top_phrases(10).await.unwrap().is_empty());

        db.remove(&spam).await.unwrap();
        assert!(!db.contains(&spam).await.unwrap());
        assert_eq!(db.top_phrases(10).await.unwrap(), vec![("spam phrase".to_string(), 50)]);
    }

    #[tokio::test]
    async fn all_lists_every_filtered_phrase() {
        let db = Database::new_in_memory().await.unwrap();
        let now = Utc::now();
        db.add(&Phrase::parse_default("spam one").unwrap(), "abuse", now)
            .await
            .unwrap();
        db.add(&Phrase::parse_default("spam two").unwrap(), "abuse", now)
            .await
            .unwrap();

        let mut all: Vec<String> = db.all().await.unwrap().into_iter().map(|p| p.into_inner()).collect();
        all.sort();
        assert_eq!(all, vec!["spam one".to_string(), "spam two".to_string()]);
    }
}
