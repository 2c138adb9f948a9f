//! Ingestion pipelines
//!
//! Two paths converge on the canonical store: ad-hoc bulk CSV uploads
//! ([`csv`]) and the periodic remote feed sync ([`feed`]). Failure handling
//! is layered: structural failures abort the current call, row-level
//! failures are logged and skipped, indexing failures never affect the
//! primary store.

pub mod csv;
pub mod feed;

pub use csv::CsvIngestor;
pub use feed::{FeedClient, FeedSyncReport, FeedSynchronizer};

use thiserror::Error;

/// Ingestion failures that abort the current ingest or sync call
///
/// Row-level problems never surface here; they are counted and logged
/// inside the pipelines.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File parsed but yielded no data rows
    #[error("Empty file: no data rows")]
    EmptyFile,

    /// Header row missing or blank
    #[error("Empty or missing header row")]
    EmptyHeader,

    /// The CSV reader could not produce a header row at all
    #[error("CSV parse error: {0}")]
    Csv(#[from] ::csv::Error),

    /// Top-level feed fetch or parse failure
    #[error("Feed error: {0}")]
    Feed(#[from] feed::FeedError),

    /// Primary-store failure outside the row loop
    #[error("Store error: {0}")]
    Store(#[from] wls_common::Error),
}
