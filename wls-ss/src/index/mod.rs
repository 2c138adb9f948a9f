//! Search-index projection of the canonical store
//!
//! The index is eventually consistent and best-effort: every canonical
//! write queues a document here, but an indexing failure never rolls back
//! or aborts the primary-store write. Two backends implement the same
//! contract — an HTTP search service, and an embedded in-process index used
//! when no search URL is configured (and by the test suite).

pub mod http;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use wls_common::{CanonicalEntity, CanonicalIndividual, ListSource, RecordKind};

pub use http::HttpSearchIndex;
pub use memory::MemoryIndex;

/// Search backend errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Index API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Document shape stored in the search index
///
/// Free-text fields (full name, aliases) drive recall; reference number and
/// kind are exact-match fields; created_at is a date field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDoc {
    pub id: String,
    pub kind: RecordKind,
    pub reference_number: String,
    pub full_name: String,
    pub alias_names: Vec<String>,
    pub list_source: ListSource,
    pub created_at: DateTime<Utc>,
}

/// Broad-recall query request
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub text: String,
    pub max_candidates: usize,
}

/// Configured search backend
#[derive(Clone)]
pub enum SearchBackend {
    Http(HttpSearchIndex),
    Memory(MemoryIndex),
}

impl SearchBackend {
    /// Create the index with its field mapping if it doesn't exist yet
    pub async fn ensure_index(&self, index: &str) -> Result<(), IndexError> {
        match self {
            SearchBackend::Http(backend) => backend.ensure_index(index).await,
            SearchBackend::Memory(backend) => backend.ensure_index(index).await,
        }
    }

    pub async fn index_document(&self, index: &str, doc: &SearchDoc) -> Result<(), IndexError> {
        match self {
            SearchBackend::Http(backend) => backend.index_document(index, doc).await,
            SearchBackend::Memory(backend) => backend.index_document(index, doc).await,
        }
    }

    pub async fn bulk_index(&self, index: &str, docs: &[SearchDoc]) -> Result<(), IndexError> {
        match self {
            SearchBackend::Http(backend) => backend.bulk_index(index, docs).await,
            SearchBackend::Memory(backend) => backend.bulk_index(index, docs).await,
        }
    }

    /// Broad-recall candidate query, in backend relevance order
    pub async fn query(&self, index: &str, spec: &QuerySpec) -> Result<Vec<SearchDoc>, IndexError> {
        match self {
            SearchBackend::Http(backend) => backend.query(index, spec).await,
            SearchBackend::Memory(backend) => backend.query(index, spec).await,
        }
    }

    pub async fn count(&self, index: &str) -> Result<u64, IndexError> {
        match self {
            SearchBackend::Http(backend) => backend.count(index).await,
            SearchBackend::Memory(backend) => backend.count(index).await,
        }
    }
}

/// Pushes canonical records into the search backend
///
/// The target index name is passed in explicitly; there is no module-level
/// "current index" state.
pub struct Indexer<'a> {
    backend: &'a SearchBackend,
    index: &'a str,
}

impl<'a> Indexer<'a> {
    pub fn new(backend: &'a SearchBackend, index: &'a str) -> Self {
        Self { backend, index }
    }

    /// Build the index document for an individual
    ///
    /// The display full name is joined from the discrete name parts, falling
    /// back to the stored free-text name when no parts survived mapping.
    pub fn individual_doc(guid: Uuid, record: &CanonicalIndividual) -> SearchDoc {
        let joined = record.joined_name();
        let full_name = if joined.is_empty() {
            record.full_name.clone()
        } else {
            joined
        };

        SearchDoc {
            id: guid.to_string(),
            kind: RecordKind::Individual,
            reference_number: record.reference_number.clone(),
            full_name,
            alias_names: record.alias_names.clone(),
            list_source: record.list_source,
            created_at: record.created_at,
        }
    }

    /// Build the index document for an entity; the entity name is used as-is
    pub fn entity_doc(guid: Uuid, record: &CanonicalEntity) -> SearchDoc {
        SearchDoc {
            id: guid.to_string(),
            kind: RecordKind::Entity,
            reference_number: record.reference_number.clone(),
            full_name: record.name.clone(),
            alias_names: record.alias_names.clone(),
            list_source: record.list_source,
            created_at: record.created_at,
        }
    }

    /// Index a single document; failure is logged, never propagated
    pub async fn index_one(&self, doc: &SearchDoc) {
        if let Err(e) = self.backend.index_document(self.index, doc).await {
            tracing::warn!(
                index = %self.index,
                doc_id = %doc.id,
                error = %e,
                "Indexing failed; primary store remains authoritative"
            );
        }
    }

    /// Index a batch of documents; failure is logged, never propagated
    pub async fn index_many(&self, docs: &[SearchDoc]) {
        if docs.is_empty() {
            return;
        }
        if let Err(e) = self.backend.bulk_index(self.index, docs).await {
            tracing::warn!(
                index = %self.index,
                batch = docs.len(),
                error = %e,
                "Bulk indexing failed; primary store remains authoritative"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn individual(first: &str, second: &str) -> CanonicalIndividual {
        let now = Utc::now();
        CanonicalIndividual {
            reference_number: "LSI-2026-000001".into(),
            first_name: Some(first.into()),
            second_name: Some(second.into()),
            third_name: None,
            full_name: format!("{} {}", first, second),
            alias_names: vec!["Johnny".into()],
            date_of_birth: None,
            national_id: None,
            nationalities: BTreeSet::new(),
            birth_cities: BTreeSet::new(),
            birth_countries: BTreeSet::new(),
            address_cities: BTreeSet::new(),
            address_countries: BTreeSet::new(),
            document_types: Vec::new(),
            document_numbers: Vec::new(),
            document_countries: Vec::new(),
            source: None,
            source_file: None,
            import_reference: None,
            list_source: ListSource::LocalSanctions,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn individual_doc_joins_name_parts() {
        let guid = Uuid::new_v4();
        let doc = Indexer::individual_doc(guid, &individual("John", "Doe"));
        assert_eq!(doc.full_name, "John Doe");
        assert_eq!(doc.kind, RecordKind::Individual);
        assert_eq!(doc.alias_names, vec!["Johnny".to_string()]);
        assert_eq!(doc.id, guid.to_string());
    }
}
