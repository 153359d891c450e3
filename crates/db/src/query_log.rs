// crates/db/src/query_log.rs
//! sqlx-backed `QueryLogSink`: the append-only raw `(phrase, user_id,
//! session_id, timestamp)` log that spec §4.2/§7 treats as the durable
//! source of truth for re-deriving phrase counts if a flush's durable
//! upsert is lost.

use crate::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use typeahead_aggregator::{QueryLogSink, StoreError};
use typeahead_types::Phrase;

#[async_trait]
impl QueryLogSink for Database {
    async fn append(
        &self,
        phrase: &Phrase,
        user_id: Option<&str>,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO query_log (phrase, user_id, session_id, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(phrase.as_str())
        .bind(user_id)
        .bind(session_id)
        .bind(now.timestamp())
        .execute(self.pool())
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

impl Database {
    /// Total entries logged for `phrase`, mainly for tests and audits —
    /// the read path never queries this table directly.
    pub async fn query_log_count(&self, phrase: &Phrase) -> Result<i64, crate::DbError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM query_log WHERE phrase = ?")
            .bind(phrase.as_str())
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}
