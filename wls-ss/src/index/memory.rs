//! Embedded in-process search index
//!
//! Used when no search service URL is configured, and by the test suite.
//! Implements the same contract as the HTTP backend: broad-recall candidate
//! retrieval in relevance order, capped at the requested size. Precision is
//! the re-ranker's job, not this backend's.

use super::{IndexError, QuerySpec, SearchDoc};
use crate::search::similarity::token_similarity;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Minimum token similarity for a document to count as a candidate
const RECALL_THRESHOLD: f64 = 0.2;

/// In-memory index keyed by index name, then document id
#[derive(Clone, Default)]
pub struct MemoryIndex {
    // BTreeMap keeps iteration deterministic, which keeps tie order stable
    inner: Arc<RwLock<HashMap<String, BTreeMap<String, SearchDoc>>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure_index(&self, index: &str) -> Result<(), IndexError> {
        self.inner
            .write()
            .await
            .entry(index.to_string())
            .or_default();
        Ok(())
    }

    pub async fn index_document(&self, index: &str, doc: &SearchDoc) -> Result<(), IndexError> {
        self.inner
            .write()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    pub async fn bulk_index(&self, index: &str, docs: &[SearchDoc]) -> Result<(), IndexError> {
        let mut inner = self.inner.write().await;
        let entries = inner.entry(index.to_string()).or_default();
        for doc in docs {
            entries.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }

    pub async fn query(&self, index: &str, spec: &QuerySpec) -> Result<Vec<SearchDoc>, IndexError> {
        let inner = self.inner.read().await;
        let Some(entries) = inner.get(index) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f64, &SearchDoc)> = entries
            .values()
            .filter_map(|doc| {
                let score = recall_score(&spec.text, doc);
                (score >= RECALL_THRESHOLD).then_some((score, doc))
            })
            .collect();

        // Stable sort preserves document-id order between equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(spec.max_candidates);

        Ok(scored.into_iter().map(|(_, doc)| doc.clone()).collect())
    }

    pub async fn count(&self, index: &str) -> Result<u64, IndexError> {
        let inner = self.inner.read().await;
        Ok(inner.get(index).map(|entries| entries.len() as u64).unwrap_or(0))
    }
}

/// Relevance over name, aliases, and reference number
fn recall_score(query: &str, doc: &SearchDoc) -> f64 {
    let mut score = token_similarity(query, &doc.full_name);
    for alias in &doc.alias_names {
        score = score.max(token_similarity(query, alias));
    }
    score.max(token_similarity(query, &doc.reference_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wls_common::{ListSource, RecordKind};

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

    #[tokio::test]
    async fn query_returns_matches_in_relevance_order() {
        let index = MemoryIndex::new();
        index.ensure_index("t").await.unwrap();
        index
            .bulk_index(
                "t",
                &[
                    doc("1", RecordKind::Individual, "John Doe"),
                    doc("2", RecordKind::Individual, "John Albert Doe"),
                    doc("3", RecordKind::Individual, "Wei Zhang"),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .query(
                "t",
                &QuerySpec {
                    text: "John Doe".to_string(),
                    max_candidates: 10,
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2, "disjoint name must not be recalled");
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[1].id, "2");
    }

    #[tokio::test]
    async fn reindexing_same_id_does_not_duplicate() {
        let index = MemoryIndex::new();
        let d = doc("1", RecordKind::Entity, "Acme Trading");
        index.index_document("t", &d).await.unwrap();
        index.index_document("t", &d).await.unwrap();
        assert_eq!(index.count("t").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn alias_matches_are_recalled() {
        let index = MemoryIndex::new();
        let mut d = doc("1", RecordKind::Individual, "Ahmed Khalfan");
        d.alias_names = vec!["Foopie".to_string()];
        index.index_document("t", &d).await.unwrap();

        let hits = index
            .query(
                "t",
                &QuerySpec {
                    text: "Foopie".to_string(),
                    max_candidates: 10,
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }
}
