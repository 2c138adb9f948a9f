//! HTTP search-service backend
//!
//! Speaks the Elasticsearch-compatible REST surface: index creation with an
//! explicit mapping, single-document puts, NDJSON bulk writes, and
//! `multi_match` fuzzy queries. All calls carry a bounded timeout; a timeout
//! surfaces as an ordinary network error.

use super::{IndexError, QuerySpec, SearchDoc};
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for a remote search-index service
#[derive(Clone)]
pub struct HttpSearchIndex {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSearchIndex {
    pub fn new(base_url: &str) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| IndexError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create the index with its mapping if it doesn't exist
    pub async fn ensure_index(&self, index: &str) -> Result<(), IndexError> {
        let url = format!("{}/{}", self.base_url, index);

        let head = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;
        if head.status().is_success() {
            return Ok(());
        }

        let mapping = json!({
            "mappings": {
                "properties": {
                    "kind":             { "type": "keyword" },
                    "reference_number": { "type": "keyword" },
                    "full_name":        { "type": "text" },
                    "alias_names":      { "type": "text" },
                    "list_source":      { "type": "keyword" },
                    "created_at":       { "type": "date" }
                }
            }
        });

        let response = self
            .http
            .put(&url)
            .json(&mapping)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(index = %index, "Created search index");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // Racing creation from another process is fine
        if body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        Err(IndexError::Api(status.as_u16(), body))
    }

    pub async fn index_document(&self, index: &str, doc: &SearchDoc) -> Result<(), IndexError> {
        let url = format!("{}/{}/_doc/{}", self.base_url, index, doc.id);

        let response = self
            .http
            .put(&url)
            .json(doc)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Api(status.as_u16(), body));
        }
        Ok(())
    }

    pub async fn bulk_index(&self, index: &str, docs: &[SearchDoc]) -> Result<(), IndexError> {
        let mut body = String::new();
        for doc in docs {
            let action = json!({ "index": { "_index": index, "_id": doc.id } });
            let source =
                serde_json::to_string(doc).map_err(|e| IndexError::Parse(e.to_string()))?;
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&source);
            body.push('\n');
        }

        let url = format!("{}/_bulk", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IndexError::Api(status.as_u16(), text));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| IndexError::Parse(e.to_string()))?;
        if result.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            tracing::warn!(index = %index, "Bulk response reported item-level errors");
        }
        Ok(())
    }

    /// Broad-recall fuzzy query across name, alias, and reference fields
    pub async fn query(&self, index: &str, spec: &QuerySpec) -> Result<Vec<SearchDoc>, IndexError> {
        let url = format!("{}/{}/_search", self.base_url, index);
        let body = json!({
            "size": spec.max_candidates,
            "query": {
                "multi_match": {
                    "query": spec.text,
                    "fields": ["full_name^2", "alias_names", "reference_number"],
                    "fuzziness": "AUTO"
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IndexError::Api(status.as_u16(), text));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| IndexError::Parse(e.to_string()))?;

        let hits = result
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexError::Parse("missing hits in search response".to_string()))?;

        let mut docs = Vec::with_capacity(hits.len());
        for hit in hits {
            let source = hit
                .get("_source")
                .ok_or_else(|| IndexError::Parse("hit without _source".to_string()))?;
            let doc: SearchDoc = serde_json::from_value(source.clone())
                .map_err(|e| IndexError::Parse(e.to_string()))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    pub async fn count(&self, index: &str) -> Result<u64, IndexError> {
        let url = format!("{}/{}/_count", self.base_url, index);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IndexError::Api(status.as_u16(), text));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| IndexError::Parse(e.to_string()))?;
        result
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| IndexError::Parse("missing count in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_normalizes_base_url() {
        let client = HttpSearchIndex::new("http://localhost:9200/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9200");
    }
}
