//! Manual feed-sync trigger
//!
//! POST /sync shares the scheduler's single-flight guard: a request that
//! arrives while any sync is running gets 409, never a second concurrent
//! sync.

use axum::{extract::State, routing::post, Json, Router};

use crate::ingest::{FeedClient, FeedSyncReport, FeedSynchronizer};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /sync
pub async fn trigger_sync(State(state): State<AppState>) -> ApiResult<Json<FeedSyncReport>> {
    let Some(feed_url) = state.config.feed_url.clone() else {
        return Err(ApiError::BadRequest("Feed URL is not configured".to_string()));
    };

    let _guard = state
        .sync_guard
        .try_lock()
        .map_err(|_| ApiError::Conflict("A feed sync is already running".to_string()))?;

    let client = FeedClient::new(&feed_url).map_err(|e| {
        tracing::error!(error = %e, "Could not build feed client");
        ApiError::Internal("Feed sync is temporarily unavailable".to_string())
    })?;

    let sync = FeedSynchronizer::new(
        state.db.clone(),
        state.search.clone(),
        state.config.search_index.clone(),
        client,
    );

    let report = sync.sync().await.map_err(|e| {
        tracing::error!(error = %e, "Manual feed sync failed");
        ApiError::Internal("Feed sync failed".to_string())
    })?;

    Ok(Json(report))
}

/// Build sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync", post(trigger_sync))
}
