//! Search API handlers
//!
//! POST /search, GET /search/status

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::records;
use crate::search::RankedMatch;
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};
use wls_common::RecordKind;

/// POST /search request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_term: String,
    /// Optional record-kind filter: "individual" or "entity"
    #[serde(default)]
    pub search_type: Option<RecordKind>,
}

/// GET /search/status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatusResponse {
    pub total_records: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// POST /search
///
/// Backend failures map to a generic 500; internal detail goes to the log,
/// never to the response body.
pub async fn search_names(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<Vec<RankedMatch>>> {
    let term = request.search_term.trim();
    if term.is_empty() {
        return Err(ApiError::BadRequest("searchTerm must not be blank".to_string()));
    }

    let results = crate::search::search(
        &state.search,
        &state.config.search_index,
        term,
        request.search_type,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Search backend failure");
        ApiError::Internal("Search is temporarily unavailable".to_string())
    })?;

    tracing::debug!(term = %term, results = results.len(), "Search served");
    Ok(Json(results))
}

/// GET /search/status
pub async fn search_status(State(state): State<AppState>) -> ApiResult<Json<SearchStatusResponse>> {
    let total_records = state
        .search
        .count(&state.config.search_index)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Search backend failure");
            ApiError::Internal("Search is temporarily unavailable".to_string())
        })?;
    let last_updated = records::latest_update(&state.db).await?;

    Ok(Json(SearchStatusResponse {
        total_records,
        last_updated,
    }))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", post(search_names))
        .route("/search/status", get(search_status))
}
