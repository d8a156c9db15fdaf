//! Portfolio admin backend.
//!
//! Serves the public portfolio listings (projects, certificates, skills) and
//! an authenticated admin API whose create/update/delete screens run every
//! selected image through an ingestion pipeline: compress, upload to the
//! category's bucket, persist the record pointing at the public URL, and
//! reclaim the stored file when the record goes away.

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

/// Full application router with state, body limit and request tracing.
pub fn build_app(state: state::AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    routes::routes::routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
