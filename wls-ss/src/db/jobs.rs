//! Import-job ledger operations
//!
//! Terminal jobs are immutable: the UPDATE is guarded so a Completed or
//! Failed row can never be rewritten, mirroring the in-model transition
//! guard.

use super::parse_timestamp;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use wls_common::{Error, ImportJob, ImportStatus, Result};

pub async fn create_job(pool: &SqlitePool, job: &ImportJob) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_jobs (
            id, file_name, file_type, file_size,
            status, entries_updated, error_message, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.id.to_string())
    .bind(&job.file_name)
    .bind(&job.file_type)
    .bind(job.file_size)
    .bind(job.status.as_str())
    .bind(job.entries_updated)
    .bind(&job.error_message)
    .bind(job.created_at.to_rfc3339())
    .bind(job.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    tracing::debug!(job_id = %job.id, file = %job.file_name, "Created import job");
    Ok(())
}

/// Persist job state; refuses to touch a row already in a terminal state
pub async fn update_job(pool: &SqlitePool, job: &ImportJob) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE import_jobs SET
            status = ?, entries_updated = ?, error_message = ?, updated_at = ?
        WHERE id = ? AND status NOT IN ('COMPLETED', 'FAILED')
        "#,
    )
    .bind(job.status.as_str())
    .bind(job.entries_updated)
    .bind(&job.error_message)
    .bind(job.updated_at.to_rfc3339())
    .bind(job.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_job(pool: &SqlitePool, id: Uuid) -> Result<Option<ImportJob>> {
    let row = sqlx::query(
        "SELECT id, file_name, file_type, file_size, status, entries_updated,
                error_message, created_at, updated_at
         FROM import_jobs WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(job_from_row).transpose()
}

/// Lookup by uploaded filename, for duplicate-upload rejection
pub async fn find_job_by_filename(pool: &SqlitePool, file_name: &str) -> Result<Option<ImportJob>> {
    let row = sqlx::query(
        "SELECT id, file_name, file_type, file_size, status, entries_updated,
                error_message, created_at, updated_at
         FROM import_jobs WHERE file_name = ?",
    )
    .bind(file_name)
    .fetch_optional(pool)
    .await?;

    row.map(job_from_row).transpose()
}

/// Most recent jobs first, for the status-polling surface
pub async fn recent_jobs(pool: &SqlitePool, limit: i64) -> Result<Vec<ImportJob>> {
    let rows = sqlx::query(
        "SELECT id, file_name, file_type, file_size, status, entries_updated,
                error_message, created_at, updated_at
         FROM import_jobs ORDER BY created_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(job_from_row).collect()
}

/// Fail any job left non-terminal by a previous process run
///
/// An in-flight import cannot survive a restart: the task that owned it is
/// gone, so the job would otherwise stay Processing forever.
pub async fn fail_stale_jobs(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = 'FAILED',
            error_message = 'Service restarted during import',
            updated_at = ?
        WHERE status NOT IN ('COMPLETED', 'FAILED')
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

fn job_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ImportJob> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))?;

    Ok(ImportJob {
        id,
        file_name: row.get("file_name"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        status: ImportStatus::parse(&row.get::<String, _>("status")),
        entries_updated: row.get("entries_updated"),
        error_message: row.get("error_message"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}
