//! Bulk-upload pipeline integration tests
//!
//! Drives CsvIngestor end to end against an in-memory database and the
//! embedded search index.

mod helpers;

use helpers::test_state;
use wls_common::{ImportJob, ImportStatus};
use wls_ss::db::jobs;
use wls_ss::ingest::{CsvIngestor, IngestError};
use wls_ss::search;

const INDIVIDUALS_CSV: &str = "\
reference_no,first_name,surname,dob,nic,nationality,aliases
LSI-2024-000001,John,Doe,1984-02-01,841234567v,Freedonia,Johnny D
,,,,,,
LSI-2024-000002,Jane,Smith,1990-07-15,901234567x,Freedonia,
";

async fn prepared_job(state: &wls_ss::AppState, file_name: &str) -> ImportJob {
    let job = ImportJob::new(file_name.to_string(), "text/csv".to_string(), 0);
    jobs::create_job(&state.db, &job).await.unwrap();
    job
}

fn ingestor(state: &wls_ss::AppState) -> CsvIngestor {
    CsvIngestor::new(
        state.db.clone(),
        state.search.clone(),
        state.config.search_index.clone(),
    )
}

#[tokio::test]
async fn malformed_row_is_skipped_and_job_completes() {
    let state = test_state().await;
    let mut job = prepared_job(&state, "individuals.csv").await;

    let processed = ingestor(&state)
        .ingest(INDIVIDUALS_CSV.as_bytes(), &mut job)
        .await
        .unwrap();

    assert_eq!(processed, 2, "the all-blank row must be skipped");
    assert_eq!(job.status, ImportStatus::Completed);
    assert_eq!(job.entries_updated, 2);

    // The terminal state was persisted before ingest returned
    let stored = jobs::find_job(&state.db, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ImportStatus::Completed);
    assert_eq!(stored.entries_updated, 2);

    // Both survivors are searchable with a high score
    let results = search::search(
        &state.search,
        &state.config.search_index,
        "John Doe",
        None,
    )
    .await
    .unwrap();
    assert!(!results.is_empty());
    assert!(results[0].similarity_percentage > 80.0);
    assert_eq!(results[0].reference_number, "LSI-2024-000001");
}

#[tokio::test]
async fn repeat_ingestion_is_idempotent() {
    let state = test_state().await;

    let mut first = prepared_job(&state, "first.csv").await;
    ingestor(&state)
        .ingest(INDIVIDUALS_CSV.as_bytes(), &mut first)
        .await
        .unwrap();

    let mut second = prepared_job(&state, "second.csv").await;
    let processed = ingestor(&state)
        .ingest(INDIVIDUALS_CSV.as_bytes(), &mut second)
        .await
        .unwrap();
    assert_eq!(processed, 2);

    // Same reference numbers: updated in place, never duplicated
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watchlist_individuals")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count, 2);

    // The index deduplicates by document id as well
    let indexed = state
        .search
        .count(&state.config.search_index)
        .await
        .unwrap();
    assert_eq!(indexed, 2);
}

#[tokio::test]
async fn update_preserves_creation_timestamp() {
    let state = test_state().await;

    let mut first = prepared_job(&state, "v1.csv").await;
    ingestor(&state)
        .ingest(
            b"reference_no,first_name,surname\nLSI-2024-000001,John,Doe\n",
            &mut first,
        )
        .await
        .unwrap();

    let created_before: String = sqlx::query_scalar(
        "SELECT created_at FROM watchlist_individuals WHERE reference_number = 'LSI-2024-000001'",
    )
    .fetch_one(&state.db)
    .await
    .unwrap();

    let mut second = prepared_job(&state, "v2.csv").await;
    ingestor(&state)
        .ingest(
            b"reference_no,first_name,surname\nLSI-2024-000001,Jonathan,Doe\n",
            &mut second,
        )
        .await
        .unwrap();

    let (created_after, full_name): (String, String) = sqlx::query_as(
        "SELECT created_at, full_name FROM watchlist_individuals WHERE reference_number = 'LSI-2024-000001'",
    )
    .fetch_one(&state.db)
    .await
    .unwrap();

    assert_eq!(created_before, created_after);
    assert_eq!(full_name, "Jonathan Doe");
}

#[tokio::test]
async fn zero_row_file_fails_structurally() {
    let state = test_state().await;
    let mut job = prepared_job(&state, "empty.csv").await;

    let err = ingestor(&state)
        .ingest(b"reference_no,first_name,surname\n", &mut job)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::EmptyFile));
    assert_eq!(job.status, ImportStatus::Failed);
    assert!(job.error_message.is_some());

    let stored = jobs::find_job(&state.db, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ImportStatus::Failed);
}

#[tokio::test]
async fn blank_header_fails_structurally() {
    let state = test_state().await;
    let mut job = prepared_job(&state, "headerless.csv").await;

    let err = ingestor(&state)
        .ingest(b"", &mut job)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::EmptyHeader | IngestError::EmptyFile));
    assert_eq!(job.status, ImportStatus::Failed);
}

#[tokio::test]
async fn entity_csv_is_detected_and_ingested() {
    let state = test_state().await;
    let mut job = prepared_job(&state, "entities.csv").await;

    let csv = "\
reference_no,entity_name,address,city,country
LSE-2024-000001,Acme Trading LLC,12 Harbor Rd,Tripoli,Libya
LSE-2024-000002,Global Shipping Ltd,Pier 4,Benghazi,Libya
";
    let processed = ingestor(&state).ingest(csv.as_bytes(), &mut job).await.unwrap();
    assert_eq!(processed, 2);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watchlist_entities")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count, 2);

    let results = search::search(
        &state.search,
        &state.config.search_index,
        "Acme Trading",
        Some(wls_common::RecordKind::Entity),
    )
    .await
    .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].kind, wls_common::RecordKind::Entity);
}
