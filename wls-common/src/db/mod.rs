//! Database access for the screening service
//!
//! One shared SQLite database holds the canonical watchlist records and the
//! import-job ledger. The search index is a projection of these tables, never
//! the other way around.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the parent directory and the database file when missing, then
/// creates the service tables idempotently.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create service tables if they don't exist
///
/// Reference numbers are deliberately not UNIQUE: the bulk path enforces
/// one record per (reference, list) itself, while the feed path may insert
/// several records sharing a reference number (the feed reuses them across
/// genuinely distinct persons).
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist_individuals (
            guid TEXT PRIMARY KEY,
            reference_number TEXT NOT NULL,
            list_source TEXT NOT NULL,
            first_name TEXT,
            second_name TEXT,
            third_name TEXT,
            full_name TEXT NOT NULL,
            alias_names TEXT NOT NULL DEFAULT '[]',
            date_of_birth TEXT,
            national_id TEXT,
            nationalities TEXT NOT NULL DEFAULT '[]',
            birth_cities TEXT NOT NULL DEFAULT '[]',
            birth_countries TEXT NOT NULL DEFAULT '[]',
            address_cities TEXT NOT NULL DEFAULT '[]',
            address_countries TEXT NOT NULL DEFAULT '[]',
            document_types TEXT NOT NULL DEFAULT '[]',
            document_numbers TEXT NOT NULL DEFAULT '[]',
            document_countries TEXT NOT NULL DEFAULT '[]',
            source TEXT,
            source_file TEXT,
            import_reference TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_individuals_reference
         ON watchlist_individuals (reference_number, list_source)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist_entities (
            guid TEXT PRIMARY KEY,
            reference_number TEXT NOT NULL,
            list_source TEXT NOT NULL,
            name TEXT NOT NULL,
            alias_names TEXT NOT NULL DEFAULT '[]',
            address_lines TEXT NOT NULL DEFAULT '[]',
            address_streets TEXT NOT NULL DEFAULT '[]',
            address_cities TEXT NOT NULL DEFAULT '[]',
            address_countries TEXT NOT NULL DEFAULT '[]',
            source TEXT,
            source_file TEXT,
            import_reference TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entities_reference
         ON watchlist_entities (reference_number, list_source)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_jobs (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL UNIQUE,
            file_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            entries_updated INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (watchlist_individuals, watchlist_entities, import_jobs)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_tables_is_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        init_tables(&pool).await.unwrap();
        init_tables(&pool).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM import_jobs")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }
}
