// crates/server/src/main.rs
//! Typeahead suggestion service binary.
//!
//! Opens the durable store, constructs the in-memory trie and aggregator,
//! spawns the flush/decay background tasks from spec §4.2/§9, then serves
//! the HTTP API until `ctrl-c`, running one final flush on the way out.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use typeahead_aggregator::{Aggregator, AggregatorConfig};
use typeahead_db::Database;
use typeahead_resilience::BreakerRegistry;
use typeahead_server::config::Config;
use typeahead_server::state::AppState;
use typeahead_server::{create_app, run_decay_loop, run_flush_loop};
use typeahead_trie::{SharedTrie, Trie};

#[tokio::main]
async fn main() -> Result<()> {
    typeahead_observability::init_tracing();
    typeahead_observability::init_metrics();

    let config = Config::default();
    eprintln!("\n\u{1f50d} typeahead-server v{}\n", env!("CARGO_PKG_VERSION"));

    let db = Database::open_default().await?;
    let breakers = Arc::new(BreakerRegistry::new_with_observer(
        config.breaker_suggestion_service,
        config.breaker_database,
        config.breaker_redis_cache,
        Arc::new(typeahead_observability::MetricsBreakerObserver),
    ));

    let trie = Arc::new(SharedTrie::new(Trie::new(config.top_k, config.max_phrase_len)));
    let aggregator = Arc::new(Aggregator::new(
        trie.clone(),
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        breakers.database.clone(),
        AggregatorConfig {
            max_phrase_len: config.max_phrase_len,
            rebuild_limit: config.rebuild_limit,
        },
    ));

    if let Err(e) = aggregator.load_filter_mirror().await {
        tracing::warn!(error = %e, "failed to load blocklist mirror at startup; falling back to breaker-gated lookups");
    }

    // Seed the live trie from the durable phrase-count store, same code
    // path as an administrative rebuild.
    match aggregator.rebuild_trie().await {
        Ok(count) => tracing::info!(phrases = count, "trie seeded from durable store"),
        Err(e) => tracing::warn!(error = %e, "initial trie seed failed; starting with an empty index"),
    }

    let state = AppState::new(config.clone(), db, trie, aggregator.clone(), breakers);

    let flush_handle = tokio::spawn(run_flush_loop(
        state.clone(),
        Duration::from_millis(config.flush_interval_ms),
    ));
    let decay_handle = tokio::spawn(run_decay_loop(
        state.clone(),
        Duration::from_millis(config.decay_interval_ms),
    ));

    let app = create_app(state.clone());
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(port = config.port, "typeahead-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    flush_handle.abort();
    decay_handle.abort();
    // Final flush on shutdown, per spec §4.2 "on shutdown".
    let report = state.aggregator.flush().await;
    tracing::info!(
        processed = report.phrases_processed,
        failed = report.phrases_failed,
        "final shutdown flush complete"
    );

    Ok(())
}
