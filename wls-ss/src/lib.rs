//! wls-ss library interface
//!
//! Exposes the screening pipeline, search engine, and router for
//! integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod index;
pub mod ingest;
pub mod mapper;
pub mod scheduler;
pub mod search;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use wls_common::ServiceConfig;

use crate::index::SearchBackend;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Configured search backend (HTTP service or embedded index)
    pub search: SearchBackend,
    /// Resolved service configuration, immutable after startup
    pub config: Arc<ServiceConfig>,
    /// Single-flight guard shared by the scheduler and the manual trigger
    pub sync_guard: Arc<Mutex<()>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, search: SearchBackend, config: ServiceConfig) -> Self {
        Self {
            db,
            search,
            config: Arc::new(config),
            sync_guard: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // Generous request cap; per-file and file-count limits are enforced in
    // the upload handler where they can map to 413 with a useful message.
    let body_limit =
        api::imports::MAX_UPLOAD_FILES * api::imports::MAX_FILE_BYTES + 1024 * 1024;

    Router::new()
        .merge(api::imports::import_routes())
        .merge(api::search::search_routes())
        .merge(api::sync::sync_routes())
        .merge(api::health::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
