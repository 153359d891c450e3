// crates/server/src/routes/mod.rs
//! Route modules, merged into one router in `lib.rs::create_app`.

pub mod admin;
pub mod health;
pub mod metrics;
pub mod query;
pub mod suggest;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(suggest::router())
        .merge(query::router())
        .merge(admin::router())
}
