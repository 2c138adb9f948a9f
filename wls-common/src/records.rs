//! Canonical watchlist record and import-job models
//!
//! Every ingestion path (bulk CSV upload, remote feed sync) converges on the
//! canonical shapes defined here before anything touches the store or the
//! search index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Which kind of watchlist record a row or document describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Individual,
    Entity,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Individual => "individual",
            RecordKind::Entity => "entity",
        }
    }
}

/// List classification a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListSource {
    ExternalSanctions,
    LocalSanctions,
    Other,
}

impl ListSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListSource::ExternalSanctions => "external-sanctions",
            ListSource::LocalSanctions => "local-sanctions",
            ListSource::Other => "other",
        }
    }

    pub fn parse(s: &str) -> ListSource {
        match s {
            "external-sanctions" => ListSource::ExternalSanctions,
            "local-sanctions" => ListSource::LocalSanctions,
            _ => ListSource::Other,
        }
    }
}

/// Canonical shape for a listed person
///
/// Set-valued fields use `BTreeSet` because source feeds routinely report
/// multiple values (several nationalities, several addresses). They never
/// contain empty strings; "not applicable" sentinels are normalized to
/// omission by the mappers before a record is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalIndividual {
    /// Natural key within a list classification
    pub reference_number: String,
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub third_name: Option<String>,
    /// Free-text display name; derived from the name parts when the source
    /// does not carry one
    pub full_name: String,
    /// Known aliases, in source order
    pub alias_names: Vec<String>,
    pub date_of_birth: Option<String>,
    /// Upper-cased national identity number
    pub national_id: Option<String>,
    pub nationalities: BTreeSet<String>,
    pub birth_cities: BTreeSet<String>,
    pub birth_countries: BTreeSet<String>,
    pub address_cities: BTreeSet<String>,
    pub address_countries: BTreeSet<String>,
    /// Identity documents, position-parallel across the three vectors
    pub document_types: Vec<String>,
    pub document_numbers: Vec<String>,
    pub document_countries: Vec<String>,
    /// Source label, e.g. "bulk-upload" or "consolidated-feed"
    pub source: Option<String>,
    pub source_file: Option<String>,
    /// Id of the import job that created or last touched this record
    pub import_reference: Option<Uuid>,
    pub list_source: ListSource,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalIndividual {
    /// Display name joined from the discrete name parts
    pub fn joined_name(&self) -> String {
        [&self.first_name, &self.second_name, &self.third_name]
            .iter()
            .filter_map(|p| p.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Canonical shape for a listed organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub reference_number: String,
    pub name: String,
    pub alias_names: Vec<String>,
    /// Free-text address lines, in source order
    pub address_lines: Vec<String>,
    pub address_streets: BTreeSet<String>,
    pub address_cities: BTreeSet<String>,
    pub address_countries: BTreeSet<String>,
    pub source: Option<String>,
    pub source_file: Option<String>,
    pub import_reference: Option<Uuid>,
    pub list_source: ListSource,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Import job lifecycle state
///
/// Transitions are monotonic: Pending → Processing → {Completed | Failed}.
/// Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "PENDING",
            ImportStatus::Processing => "PROCESSING",
            ImportStatus::Completed => "COMPLETED",
            ImportStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> ImportStatus {
        match s {
            "PENDING" => ImportStatus::Pending,
            "PROCESSING" => ImportStatus::Processing,
            "COMPLETED" => ImportStatus::Completed,
            _ => ImportStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

/// Tracked lifecycle record for one bulk-upload ingestion attempt
///
/// One job per uploaded file, mutated only by the ingestion pipeline that
/// owns it. Serialized as-is to the HTTP layer for status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub status: ImportStatus,
    pub entries_updated: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// Create a new Pending job for an accepted upload
    pub fn new(file_name: String, file_type: String, file_size: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            file_name,
            file_type,
            file_size,
            status: ImportStatus::Pending,
            entries_updated: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the job to a new state
    ///
    /// Returns false without changing anything when the job is already in a
    /// terminal state; only a fresh job may process the same file again.
    pub fn transition_to(&mut self, status: ImportStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
