//! Remote-feed ingestion pipeline
//!
//! Periodically pulls the consolidated list as a JSON document, walks the
//! individuals and entities sub-trees, and inserts records the store has
//! not seen. The feed reuses reference numbers across genuinely distinct
//! records, so deduplication keys on a composite (reference + alias set +
//! birth year + document numbers) rather than the bulk path's pure
//! reference-number key.

use super::IngestError;
use crate::db::records;
use crate::index::{Indexer, SearchBackend, SearchDoc};
use crate::mapper::{self, clean_value, Dialect, MapContext, RawRecord};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::time::Duration;
use thiserror::Error;
use wls_common::{CanonicalEntity, CanonicalIndividual, ListSource};

const FEED_TIMEOUT_SECS: u64 = 30;

/// Feed transport and parse errors; all fatal to the current sync
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Feed returned status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// HTTP client for the consolidated-feed endpoint
///
/// The reference feed requires no authentication; the only protection the
/// client needs is a bounded timeout.
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
}

impl FeedClient {
    pub fn new(url: &str) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    /// Fetch and parse the consolidated document
    pub async fn fetch(&self) -> Result<Value, FeedError> {
        tracing::debug!(url = %self.url, "Fetching consolidated feed");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))
    }
}

/// Outcome counters for one feed sync
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSyncReport {
    pub individuals_added: u64,
    pub entities_added: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Runs one feed sync end to end
pub struct FeedSynchronizer {
    db: SqlitePool,
    backend: SearchBackend,
    index: String,
    client: FeedClient,
}

impl FeedSynchronizer {
    pub fn new(db: SqlitePool, backend: SearchBackend, index: String, client: FeedClient) -> Self {
        Self {
            db,
            backend,
            index,
            client,
        }
    }

    /// Fetch the remote document and ingest it
    ///
    /// Idempotent: a document the store has fully seen adds nothing. Only a
    /// top-level fetch/parse failure aborts; per-record failures are logged
    /// and skipped.
    pub async fn sync(&self) -> Result<FeedSyncReport, IngestError> {
        let document = self.client.fetch().await?;
        self.sync_document(&document).await
    }

    /// Ingest an already-fetched consolidated document
    pub async fn sync_document(&self, document: &Value) -> Result<FeedSyncReport, IngestError> {
        if !document.is_object() {
            return Err(FeedError::Parse("top-level document is not an object".to_string()).into());
        }

        let ctx = MapContext::new(
            Some("consolidated-feed".to_string()),
            None,
            None,
            ListSource::ExternalSanctions,
        );

        let indexer = Indexer::new(&self.backend, &self.index);
        let mut report = FeedSyncReport::default();
        let mut batch: Vec<SearchDoc> = Vec::new();

        for node in subtree(document, "individuals", "individual") {
            match individual_from_node(node, &ctx) {
                Some(record) => match self.write_individual(&record).await {
                    Ok(Some(doc)) => {
                        report.individuals_added += 1;
                        batch.push(doc);
                    }
                    Ok(None) => report.skipped += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(reference = %record.reference_number, error = %e, "Skipping feed individual");
                    }
                },
                None => {
                    report.failed += 1;
                    tracing::warn!("Skipping feed individual without a usable name");
                }
            }
        }

        for node in subtree(document, "entities", "entity") {
            match entity_from_node(node, &ctx) {
                Some(record) => match self.write_entity(&record).await {
                    Ok(Some(doc)) => {
                        report.entities_added += 1;
                        batch.push(doc);
                    }
                    Ok(None) => report.skipped += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(reference = %record.reference_number, error = %e, "Skipping feed entity");
                    }
                },
                None => {
                    report.failed += 1;
                    tracing::warn!("Skipping feed entity without a usable name");
                }
            }
        }

        indexer.index_many(&batch).await;

        tracing::info!(
            individuals = report.individuals_added,
            entities = report.entities_added,
            skipped = report.skipped,
            failed = report.failed,
            "Feed sync finished"
        );
        Ok(report)
    }

    /// Insert the record unless its composite identity already exists
    async fn write_individual(
        &self,
        record: &CanonicalIndividual,
    ) -> wls_common::Result<Option<SearchDoc>> {
        if records::find_individual_composite(&self.db, record)
            .await?
            .is_some()
        {
            return Ok(None);
        }
        let guid = records::insert_individual(&self.db, record).await?;
        Ok(Some(Indexer::individual_doc(guid, record)))
    }

    async fn write_entity(
        &self,
        record: &CanonicalEntity,
    ) -> wls_common::Result<Option<SearchDoc>> {
        if records::find_entity_composite(&self.db, record)
            .await?
            .is_some()
        {
            return Ok(None);
        }
        let guid = records::insert_entity(&self.db, record).await?;
        Ok(Some(Indexer::entity_doc(guid, record)))
    }
}

/// Treat a JSON value as a node list, tolerating a single node
///
/// The feed's serializer collapses one-element collections into a bare
/// object, so every one-or-many position goes through here.
pub(crate) fn as_nodes(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(node @ Value::Object(_)) => vec![node],
        _ => Vec::new(),
    }
}

/// Extract the record nodes under a named group sub-tree
fn subtree<'a>(document: &'a Value, group: &str, item: &str) -> Vec<&'a Value> {
    let root = document.get("consolidated_list").unwrap_or(document);
    let Some(group_node) = root.get(group) else {
        return Vec::new();
    };
    match group_node.get(item) {
        Some(items) => as_nodes(Some(items)),
        // The group itself may already be the node list
        None => as_nodes(Some(group_node)),
    }
}

/// Cleaned string at the first matching key of a node
fn node_str(node: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| node.get(*key))
        .filter_map(|value| match value {
            Value::String(s) => clean_value(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
}

/// Collect cleaned strings from a one-or-many nested position
///
/// `outer` names the wrapper node, `inner` the value key inside each
/// wrapped node, e.g. individual_alias / alias_name. The inner value may
/// itself be a single string or a list of strings.
fn nested_values(node: &Value, outer: &str, inner: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for wrapped in as_nodes(node.get(outer)) {
        for key in inner {
            if let Some(value) = wrapped.get(*key) {
                collect_strings(value, &mut out);
                break;
            }
        }
    }
    out
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(clean_value(s)),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Map one feed individual node to a canonical record
///
/// Flat fields go through the ordinary external-dialect mapper; the feed's
/// nested one-or-many nodes (aliases, documents, places) are folded in on
/// top, with the same omit-rather-than-placeholder normalization.
fn individual_from_node(node: &Value, ctx: &MapContext) -> Option<CanonicalIndividual> {
    let object = node.as_object()?;
    let raw = RawRecord::from_json_object(object);
    let mut record = mapper::map_individual(&raw, Dialect::External, ctx);

    for alias in nested_values(node, "individual_alias", &["alias_name", "name"]) {
        if !record.alias_names.contains(&alias) {
            record.alias_names.push(alias);
        }
    }
    if record.date_of_birth.is_none() {
        record.date_of_birth = as_nodes(node.get("individual_date_of_birth"))
            .into_iter()
            .filter_map(|n| node_str(n, &["date", "year"]))
            .next();
    }
    record
        .nationalities
        .extend(nested_values(node, "nationality", &["value"]));
    for place in as_nodes(node.get("individual_place_of_birth")) {
        record.birth_cities.extend(node_str(place, &["city"]));
        record.birth_countries.extend(node_str(place, &["country"]));
    }
    for address in as_nodes(node.get("individual_address")) {
        record.address_cities.extend(node_str(address, &["city"]));
        record
            .address_countries
            .extend(node_str(address, &["country"]));
    }
    for document in as_nodes(node.get("individual_document")) {
        let Some(number) = node_str(document, &["number"]) else {
            continue;
        };
        record.document_numbers.push(number);
        record
            .document_types
            .push(node_str(document, &["type_of_document", "type"]).unwrap_or_default());
        record
            .document_countries
            .push(node_str(document, &["issuing_country", "country_of_issue"]).unwrap_or_default());
    }

    if record.full_name.is_empty() {
        return None;
    }
    Some(record)
}

/// Map one feed entity node to a canonical record
fn entity_from_node(node: &Value, ctx: &MapContext) -> Option<CanonicalEntity> {
    let object = node.as_object()?;
    let raw = RawRecord::from_json_object(object);
    let mut record = mapper::map_entity(&raw, Dialect::External, ctx);

    for alias in nested_values(node, "entity_alias", &["alias_name", "name"]) {
        if !record.alias_names.contains(&alias) {
            record.alias_names.push(alias);
        }
    }
    for address in as_nodes(node.get("entity_address")) {
        record.address_streets.extend(node_str(address, &["street"]));
        record.address_cities.extend(node_str(address, &["city"]));
        record
            .address_countries
            .extend(node_str(address, &["country"]));
    }

    if record.name.is_empty() {
        return None;
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn as_nodes_tolerates_single_and_list() {
        let single = json!({"alias_name": "Abu Omar"});
        let list = json!([{"alias_name": "a"}, {"alias_name": "b"}]);

        assert_eq!(as_nodes(Some(&single)).len(), 1);
        assert_eq!(as_nodes(Some(&list)).len(), 2);
        assert!(as_nodes(Some(&json!("scalar"))).is_empty());
        assert!(as_nodes(None).is_empty());
    }

    #[test]
    fn individual_node_maps_nested_fields() {
        let ctx = MapContext::new(None, None, None, ListSource::ExternalSanctions);
        let node = json!({
            "dataid": "QDi.417",
            "first_name": "Ahmed",
            "second_name": "Khalfan",
            "individual_alias": {"alias_name": "Foopie"},
            "individual_date_of_birth": {"date": "1974-03-14"},
            "nationality": {"value": ["Tanzania", "NA"]},
            "individual_document": [
                {"type_of_document": "Passport", "number": "A123456", "issuing_country": "Tanzania"},
                {"type_of_document": "ID", "number": "NA"}
            ],
            "individual_place_of_birth": {"city": "Zanzibar", "country": "Tanzania"}
        });

        let record = individual_from_node(&node, &ctx).unwrap();
        assert_eq!(record.reference_number, "QDi.417");
        assert_eq!(record.full_name, "Ahmed Khalfan");
        assert_eq!(record.alias_names, vec!["Foopie".to_string()]);
        assert_eq!(record.date_of_birth.as_deref(), Some("1974-03-14"));
        // Sentinel nationality dropped
        assert_eq!(record.nationalities.len(), 1);
        // Document without a number is dropped entirely
        assert_eq!(record.document_numbers, vec!["A123456".to_string()]);
        assert_eq!(record.document_types, vec!["Passport".to_string()]);
        assert!(record.birth_cities.contains("Zanzibar"));
    }

    #[test]
    fn nameless_individual_node_is_rejected() {
        let ctx = MapContext::new(None, None, None, ListSource::ExternalSanctions);
        let node = json!({"dataid": "QDi.001", "nationality": {"value": "Yemen"}});
        assert!(individual_from_node(&node, &ctx).is_none());
    }

    #[test]
    fn entity_node_maps_addresses() {
        let ctx = MapContext::new(None, None, None, ListSource::ExternalSanctions);
        let node = json!({
            "reference_number": "QDe.070",
            "name": "Acme Trading LLC",
            "entity_alias": [{"alias_name": "Acme"}, {"alias_name": "ATL"}],
            "entity_address": {"street": "12 Harbor Rd", "city": "Tripoli", "country": "Libya"}
        });

        let record = entity_from_node(&node, &ctx).unwrap();
        assert_eq!(record.name, "Acme Trading LLC");
        assert_eq!(record.alias_names.len(), 2);
        assert!(record.address_streets.contains("12 Harbor Rd"));
        assert!(record.address_countries.contains("Libya"));
    }
}
