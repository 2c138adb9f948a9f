//! Bulk-upload ingestion pipeline
//!
//! One uploaded CSV file is one [`ImportJob`]. The pipeline owns the job's
//! lifecycle: Processing before parsing begins, a terminal state before
//! control returns to the caller, on every path. Row-level problems are
//! best-effort — counted, logged, skipped — only structural failures fail
//! the file.

use super::IngestError;
use crate::db::{jobs, records};
use crate::index::{Indexer, SearchBackend, SearchDoc};
use crate::mapper::{self, detect, Dialect, MapContext, RawRecord};
use sqlx::SqlitePool;
use wls_common::{ImportJob, ImportStatus, ListSource, RecordKind};

/// Index submissions are flushed in batches of this size
pub const INDEX_BATCH_SIZE: usize = 500;

/// Ingests one uploaded CSV file into the store and the search index
pub struct CsvIngestor {
    db: SqlitePool,
    backend: SearchBackend,
    index: String,
}

impl CsvIngestor {
    pub fn new(db: SqlitePool, backend: SearchBackend, index: String) -> Self {
        Self { db, backend, index }
    }

    /// Run the pipeline for one file
    ///
    /// Returns the number of rows written. The job is guaranteed to be in a
    /// terminal state (Completed or Failed, persisted) when this returns.
    pub async fn ingest(&self, data: &[u8], job: &mut ImportJob) -> Result<i64, IngestError> {
        job.transition_to(ImportStatus::Processing);
        jobs::update_job(&self.db, job).await?;

        match self.run(data, job).await {
            Ok(processed) => {
                job.entries_updated = processed;
                job.transition_to(ImportStatus::Completed);
                jobs::update_job(&self.db, job).await?;
                tracing::info!(
                    job_id = %job.id,
                    file = %job.file_name,
                    entries = processed,
                    "Import completed"
                );
                Ok(processed)
            }
            Err(e) => {
                job.error_message = Some(e.to_string());
                job.transition_to(ImportStatus::Failed);
                if let Err(persist_err) = jobs::update_job(&self.db, job).await {
                    tracing::error!(
                        job_id = %job.id,
                        error = %persist_err,
                        "Failed to persist failed job state"
                    );
                }
                tracing::warn!(job_id = %job.id, file = %job.file_name, error = %e, "Import failed");
                Err(e)
            }
        }
    }

    async fn run(&self, data: &[u8], job: &ImportJob) -> Result<i64, IngestError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .flexible(true)
            .trim(::csv::Trim::All)
            .from_reader(data);

        let headers = reader.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::EmptyHeader);
        }

        // Materialize the row set; detection runs once against it and
        // malformed rows must not abort their neighbors.
        let mut rows = Vec::new();
        let mut row_errors: u64 = 0;
        for (line, result) in reader.records().enumerate() {
            match result {
                Ok(record) => rows.push(RawRecord::from_csv(&headers, &record)),
                Err(e) => {
                    row_errors += 1;
                    tracing::warn!(file = %job.file_name, line = line + 2, error = %e, "Skipping malformed row");
                }
            }
        }
        if rows.is_empty() {
            return Err(IngestError::EmptyFile);
        }

        let kind = detect::detect_record_kind(&rows[0]);
        let dialect = detect::detect_dialect(&rows[0]);
        let list_source = match dialect {
            Dialect::Local => ListSource::LocalSanctions,
            Dialect::External => ListSource::ExternalSanctions,
        };
        tracing::info!(
            file = %job.file_name,
            kind = kind.as_str(),
            dialect = ?dialect,
            rows = rows.len(),
            "Detected batch format"
        );

        let ctx = MapContext::new(
            Some("bulk-upload".to_string()),
            Some(job.file_name.clone()),
            Some(job.id),
            list_source,
        );

        let indexer = Indexer::new(&self.backend, &self.index);
        let mut batch: Vec<SearchDoc> = Vec::with_capacity(INDEX_BATCH_SIZE);
        let mut processed: i64 = 0;

        for (i, raw) in rows.iter().enumerate() {
            match self.write_row(raw, kind, dialect, &ctx).await {
                Ok(doc) => {
                    processed += 1;
                    batch.push(doc);
                    if batch.len() >= INDEX_BATCH_SIZE {
                        indexer.index_many(&batch).await;
                        batch.clear();
                    }
                }
                Err(RowError::NoName) => {
                    row_errors += 1;
                    tracing::warn!(file = %job.file_name, row = i + 1, "Skipping row without a usable name");
                }
                Err(RowError::Store(e)) => {
                    row_errors += 1;
                    tracing::warn!(file = %job.file_name, row = i + 1, error = %e, "Skipping row after store failure");
                }
            }
        }
        indexer.index_many(&batch).await;

        if row_errors > 0 {
            tracing::warn!(
                file = %job.file_name,
                skipped = row_errors,
                processed,
                "Import finished with skipped rows"
            );
        }
        Ok(processed)
    }

    /// Map one row and upsert it by reference number
    async fn write_row(
        &self,
        raw: &RawRecord,
        kind: RecordKind,
        dialect: Dialect,
        ctx: &MapContext,
    ) -> Result<SearchDoc, RowError> {
        match kind {
            RecordKind::Individual => {
                let record = mapper::map_individual(raw, dialect, ctx);
                if record.full_name.is_empty() {
                    return Err(RowError::NoName);
                }
                let (guid, _inserted) = records::upsert_individual(&self.db, &record).await?;
                Ok(Indexer::individual_doc(guid, &record))
            }
            RecordKind::Entity => {
                let record = mapper::map_entity(raw, dialect, ctx);
                if record.name.is_empty() {
                    return Err(RowError::NoName);
                }
                let (guid, _inserted) = records::upsert_entity(&self.db, &record).await?;
                Ok(Indexer::entity_doc(guid, &record))
            }
        }
    }
}

/// Row-level failures, recovered inside the row loop
enum RowError {
    /// Row mapped to a record with no name at all
    NoName,
    Store(wls_common::Error),
}

impl From<wls_common::Error> for RowError {
    fn from(e: wls_common::Error) -> Self {
        RowError::Store(e)
    }
}
