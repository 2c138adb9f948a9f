//! Store access for canonical records and import jobs

pub mod jobs;
pub mod records;

use wls_common::{Error, Result};

/// Encode a list-valued field as a JSON text column
pub(crate) fn encode_list<T: serde::Serialize>(values: &T) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| Error::Internal(format!("Failed to serialize list column: {}", e)))
}

/// Decode a JSON text column back into a list-valued field
pub(crate) fn decode_list<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::Internal(format!("Failed to deserialize list column: {}", e)))
}

pub(crate) fn parse_timestamp(text: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
}
