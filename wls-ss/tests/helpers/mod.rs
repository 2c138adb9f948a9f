//! Shared helpers for integration tests

use sqlx::SqlitePool;
use wls_common::ServiceConfig;
use wls_ss::index::{MemoryIndex, SearchBackend};
use wls_ss::AppState;

/// App state with an in-memory database and the embedded search index
pub async fn test_state() -> AppState {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    wls_common::db::init_tables(&pool).await.unwrap();

    let config = ServiceConfig {
        search_index: "watchlist-test".to_string(),
        ..ServiceConfig::default()
    };

    AppState::new(pool, SearchBackend::Memory(MemoryIndex::new()), config)
}

/// Hand-rolled multipart body: one part per (filename, content) pair
pub fn multipart_body(files: &[(&str, &str)]) -> (String, Vec<u8>) {
    let boundary = "wls-test-boundary";
    let mut body = Vec::new();
    for (name, content) in files {
        // Mirror what a real client sends: CSV files carry text/csv, anything
        // else carries a generic binary type. Hardcoding text/csv here masked
        // the non-CSV rejection path.
        let content_type = if name.to_lowercase().ends_with(".csv") {
            "text/csv"
        } else {
            "application/octet-stream"
        };
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n{content}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={boundary}"),
        body,
    )
}
