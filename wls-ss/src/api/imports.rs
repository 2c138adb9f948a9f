//! Import API handlers
//!
//! POST /imports/upload, GET /imports/recent, GET /imports/:id

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::db::jobs;
use crate::ingest::CsvIngestor;
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};
use wls_common::ImportJob;

/// Upload limits: at most this many files per request
pub const MAX_UPLOAD_FILES: usize = 5;
/// Upload limits: at most this many bytes per file
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

const RECENT_JOBS_LIMIT: i64 = 50;

struct UploadedFile {
    file_name: String,
    content_type: String,
    data: axum::body::Bytes,
}

/// POST /imports/upload
///
/// Accepts up to five CSV files and runs each through the bulk pipeline.
/// Every accepted file gets its own ImportJob; a file that fails during
/// processing surfaces as a Failed job in the 201 response, not as a
/// request error.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Vec<ImportJob>>)> {
    let mut files: Vec<UploadedFile> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            // Non-file form fields are ignored
            continue;
        };
        let content_type = field.content_type().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read uploaded file: {}", e)))?;
        files.push(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    // Validate the whole request before creating any job
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }
    if files.len() > MAX_UPLOAD_FILES {
        return Err(ApiError::PayloadTooLarge(format!(
            "At most {} files per upload",
            MAX_UPLOAD_FILES
        )));
    }
    for file in &files {
        if !is_csv(&file.file_name, &file.content_type) {
            return Err(ApiError::BadRequest(format!(
                "Only CSV files are accepted: {}",
                file.file_name
            )));
        }
        if file.data.len() > MAX_FILE_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} exceeds the {} MB per-file limit",
                file.file_name,
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        if jobs::find_job_by_filename(&state.db, &file.file_name)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(format!(
                "A file named {} was already imported",
                file.file_name
            )));
        }
    }

    let ingestor = CsvIngestor::new(
        state.db.clone(),
        state.search.clone(),
        state.config.search_index.clone(),
    );

    let mut created = Vec::with_capacity(files.len());
    for file in files {
        let declared_type = if file.content_type.is_empty() {
            "text/csv".to_string()
        } else {
            file.content_type.clone()
        };
        let mut job = ImportJob::new(
            file.file_name.clone(),
            declared_type,
            file.data.len() as i64,
        );
        jobs::create_job(&state.db, &job).await?;

        // Failure is already recorded on the job itself
        let _ = ingestor.ingest(&file.data, &mut job).await;
        created.push(job);
    }

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /imports/recent
pub async fn recent_imports(State(state): State<AppState>) -> ApiResult<Json<Vec<ImportJob>>> {
    let jobs = jobs::recent_jobs(&state.db, RECENT_JOBS_LIMIT).await?;
    Ok(Json(jobs))
}

/// GET /imports/{id}
pub async fn import_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ImportJob>> {
    let job = jobs::find_job(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Import job not found: {}", id)))?;
    Ok(Json(job))
}

fn is_csv(file_name: &str, content_type: &str) -> bool {
    file_name.to_lowercase().ends_with(".csv")
        || content_type.eq_ignore_ascii_case("text/csv")
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/imports/upload", post(upload_files))
        .route("/imports/recent", get(recent_imports))
        .route("/imports/:id", get(import_by_id))
}
