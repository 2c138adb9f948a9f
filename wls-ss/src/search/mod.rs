//! Fuzzy name-matching search engine
//!
//! Two stages: a broad-recall query against the search index (edit-distance
//! tolerant, capped), then precise re-ranking with the symmetric token
//! similarity in [`similarity`]. The index provides recall; the re-ranker
//! provides the score users see.

pub mod similarity;

use crate::index::{IndexError, QuerySpec, SearchBackend, SearchDoc};
use serde::Serialize;
use wls_common::{ListSource, RecordKind};

/// Upper bound on candidates pulled from the index per query
pub const MAX_CANDIDATES: usize = 200;

/// One scored search result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMatch {
    pub reference_number: String,
    pub kind: RecordKind,
    pub full_name: String,
    pub alias_names: Vec<String>,
    pub list_source: ListSource,
    /// Symmetric token similarity, percentage with two-decimal precision
    pub similarity_percentage: f64,
}

/// Search the index and re-rank candidates by name similarity
///
/// The index name is explicit configuration passed by the caller; nothing
/// here holds cross-request state.
pub async fn search(
    backend: &SearchBackend,
    index: &str,
    query_text: &str,
    kind_filter: Option<RecordKind>,
) -> Result<Vec<RankedMatch>, IndexError> {
    let spec = QuerySpec {
        text: query_text.to_string(),
        max_candidates: MAX_CANDIDATES,
    };
    let candidates = backend.query(index, &spec).await?;

    tracing::debug!(
        query = %query_text,
        candidates = candidates.len(),
        "Re-ranking search candidates"
    );

    let mut results: Vec<RankedMatch> = candidates
        .into_iter()
        .filter(|doc| kind_filter.map_or(true, |kind| doc.kind == kind))
        .map(|doc| rank(query_text, doc))
        .collect();

    // Stable sort: candidates tied on score keep the index's relevance order
    results.sort_by(|a, b| {
        b.similarity_percentage
            .partial_cmp(&a.similarity_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(results)
}

fn rank(query_text: &str, doc: SearchDoc) -> RankedMatch {
    let similarity_percentage = similarity::similarity_percentage(query_text, &doc.full_name);
    RankedMatch {
        reference_number: doc.reference_number,
        kind: doc.kind,
        full_name: doc.full_name,
        alias_names: doc.alias_names,
        list_source: doc.list_source,
        similarity_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use chrono::Utc;

    fn doc(id: &str, kind: RecordKind, name: &str) -> SearchDoc {
        SearchDoc {
            id: id.to_string(),
            kind,
            reference_number: format!("REF-{}", id),
            full_name: name.to_string(),
            alias_names: Vec::new(),
            list_source: ListSource::ExternalSanctions,
            created_at: Utc::now(),
        }
    }

    async fn seeded_backend() -> SearchBackend {
        let memory = MemoryIndex::new();
        memory
            .bulk_index(
                "t",
                &[
                    doc("1", RecordKind::Individual, "John Doe"),
                    doc("2", RecordKind::Individual, "Doe, John"),
                    doc("3", RecordKind::Individual, "John Albert Doe"),
                    doc("4", RecordKind::Entity, "Doe John Holdings"),
                ],
            )
            .await
            .unwrap();
        SearchBackend::Memory(memory)
    }

    #[tokio::test]
    async fn results_sort_descending_by_score() {
        let backend = seeded_backend().await;
        let results = search(&backend, "t", "John Doe", None).await.unwrap();

        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].similarity_percentage >= pair[1].similarity_percentage);
        }
        // Exact and reordered-name candidates both score 100
        assert_eq!(results[0].similarity_percentage, 100.0);
        assert_eq!(results[1].similarity_percentage, 100.0);
    }

    #[tokio::test]
    async fn kind_filter_drops_other_kinds() {
        let backend = seeded_backend().await;
        let results = search(&backend, "t", "John Doe", Some(RecordKind::Entity))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, RecordKind::Entity);
    }

    #[tokio::test]
    async fn empty_index_returns_empty_results() {
        let backend = SearchBackend::Memory(MemoryIndex::new());
        let results = search(&backend, "t", "John Doe", None).await.unwrap();
        assert!(results.is_empty());
    }
}
