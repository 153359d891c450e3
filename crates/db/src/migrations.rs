// crates/db/src/migrations.rs
//! Inline SQL migrations for the three durable tables spec §6 names:
//! `phrase_counts`, `query_log`, `filtered_phrases`. Simple inline
//! migrations (rather than sqlx migration files) since the schema is small
//! and self-contained — same rationale the teacher's `crates/db` uses.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: durable phrase-count store.
    r#"
CREATE TABLE IF NOT EXISTS phrase_counts (
    phrase       TEXT PRIMARY KEY,
    count        INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
    last_updated INTEGER NOT NULL,
    is_filtered  INTEGER NOT NULL DEFAULT 0
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_phrase_counts_count ON phrase_counts(count DESC);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_phrase_counts_filtered ON phrase_counts(is_filtered);"#,
    // Migration 2: append-only raw query log, the source of truth for
    // re-derivation per spec §4.2 failure semantics.
    r#"
CREATE TABLE IF NOT EXISTS query_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    phrase     TEXT NOT NULL,
    user_id    TEXT,
    session_id TEXT,
    timestamp  INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_query_log_timestamp ON query_log(timestamp);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_query_log_phrase ON query_log(phrase);"#,
    // Migration 3: filtered-phrase blocklist, audit-logged add/remove.
    r#"
CREATE TABLE IF NOT EXISTS filtered_phrases (
    phrase   TEXT PRIMARY KEY,
    reason   TEXT NOT NULL DEFAULT '',
    added_at INTEGER NOT NULL
);
"#,
];
