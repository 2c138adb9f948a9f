//! Field mapping into canonical records
//!
//! Pure conversion of raw ingested rows into [`CanonicalIndividual`] /
//! [`CanonicalEntity`]. The mappers are total: missing or unusable source
//! fields map to empty or omitted values, never to placeholder strings, and
//! mapping itself performs no I/O.

pub mod aliases;
pub mod detect;

use chrono::{Datelike, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;
use wls_common::{CanonicalEntity, CanonicalIndividual, ListSource, RecordKind};

/// Source-specific field-naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Locally maintained lists with LSI-/LSE- reference numbers
    Local,
    /// Everything else, including the consolidated remote feed
    External,
}

/// Sentinel values source feeds use for "not applicable"
///
/// Normalized to omission; never stored literally.
const SENTINELS: &[&str] = &["na", "n/a", "n.a.", "-", "not available", "not applicable", "nil"];

/// Shared context for one mapping batch
///
/// Carries provenance plus the monotonic counter used to synthesize
/// reference numbers for rows that arrive without a usable one.
pub struct MapContext {
    pub source: Option<String>,
    pub source_file: Option<String>,
    pub import_reference: Option<Uuid>,
    pub list_source: ListSource,
    seq: AtomicU64,
}

impl MapContext {
    pub fn new(
        source: Option<String>,
        source_file: Option<String>,
        import_reference: Option<Uuid>,
        list_source: ListSource,
    ) -> Self {
        Self {
            source,
            source_file,
            import_reference,
            list_source,
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Synthesize a reference number: prefix, current year, monotonic sequence
    fn synthesize_reference(&self, prefix: &str) -> String {
        format!("{}-{}-{:06}", prefix, Utc::now().year(), self.next_seq())
    }
}

/// One raw ingested row, normalized-header → value
///
/// Built either from a CSV header/record pair or from a flat JSON object.
/// Header normalization makes lookups case- and punctuation-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn from_csv(headers: &csv::StringRecord, row: &csv::StringRecord) -> Self {
        let mut fields = HashMap::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            let key = normalize_header(header);
            if !key.is_empty() {
                fields.insert(key, value.to_string());
            }
        }
        Self { fields }
    }

    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in object {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            let key = normalize_header(key);
            if !key.is_empty() {
                fields.insert(key, text);
            }
        }
        Self { fields }
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in pairs {
            fields.insert(normalize_header(key), value.to_string());
        }
        Self { fields }
    }

    /// First non-empty, non-sentinel value across the alias chain
    pub fn first(&self, alias_chain: &[&str]) -> Option<String> {
        alias_chain
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .find_map(|value| clean_value(value))
    }

    /// First list-shaped value across the alias chain, split and cleaned
    pub fn list(&self, alias_chain: &[&str]) -> Vec<String> {
        alias_chain
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .map(|value| split_list(value))
            .find(|items| !items.is_empty())
            .unwrap_or_default()
    }

    /// Whether the source row carried this header at all, value or not
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Normalize a header name: lowercase, non-alphanumeric runs collapse to '_'
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_sep = true;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Trim a raw value, dropping empties and "not applicable" sentinels
pub fn clean_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if SENTINELS.contains(&lowered.as_str()) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Split a delimiter-separated value into cleaned, de-duplicated tokens
///
/// Accepts ';' or ',' separated input; order is preserved.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for token in raw.split([';', ',']) {
        if let Some(value) = clean_value(token) {
            if seen.insert(value.clone()) {
                out.push(value);
            }
        }
    }
    out
}

fn set_from(values: Vec<String>) -> BTreeSet<String> {
    values.into_iter().collect()
}

/// Classify a reference number by its local prefix, if it has one
///
/// Local references look like `LSI-2024-000123` (individuals) or
/// `LSE-2024-000123` (entities).
pub fn local_reference_kind(reference: &str) -> Option<RecordKind> {
    let kind = if reference.starts_with("LSI-") {
        RecordKind::Individual
    } else if reference.starts_with("LSE-") {
        RecordKind::Entity
    } else {
        return None;
    };

    let rest = &reference[4..];
    let (year, seq) = rest.split_once('-')?;
    if year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && !seq.is_empty()
        && seq.chars().all(|c| c.is_ascii_digit())
    {
        Some(kind)
    } else {
        None
    }
}

/// Resolve the canonical reference number for a row
fn resolve_reference(
    raw: &RawRecord,
    dialect: Dialect,
    ctx: &MapContext,
    local_prefix: &str,
) -> String {
    let source_ref = raw.first(aliases::REFERENCE);
    match dialect {
        Dialect::Local => match source_ref {
            Some(reference) if local_reference_kind(&reference).is_some() => reference,
            // Out-of-pattern local references are replaced, not passed through
            _ => ctx.synthesize_reference(local_prefix),
        },
        Dialect::External => {
            source_ref.unwrap_or_else(|| ctx.synthesize_reference("EXT"))
        }
    }
}

/// Map one raw row to a canonical individual
pub fn map_individual(raw: &RawRecord, dialect: Dialect, ctx: &MapContext) -> CanonicalIndividual {
    let reference_number = resolve_reference(raw, dialect, ctx, "LSI");

    let mut first_name = raw.first(aliases::FIRST_NAME);
    let mut second_name = raw.first(aliases::SECOND_NAME);
    let mut third_name = raw.first(aliases::THIRD_NAME);
    let source_full_name = raw.first(aliases::FULL_NAME);

    // A combined name field decomposes on whitespace when no discrete parts
    // were supplied: first token, second token, remainder as third.
    if first_name.is_none() && second_name.is_none() && third_name.is_none() {
        if let Some(full) = &source_full_name {
            let mut parts = full.split_whitespace();
            first_name = parts.next().map(str::to_string);
            second_name = parts.next().map(str::to_string);
            let rest = parts.collect::<Vec<_>>().join(" ");
            if !rest.is_empty() {
                third_name = Some(rest);
            }
        }
    }

    let joined = [&first_name, &second_name, &third_name]
        .iter()
        .filter_map(|p| p.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    let full_name = source_full_name.unwrap_or(joined);

    let now = Utc::now();
    CanonicalIndividual {
        reference_number,
        first_name,
        second_name,
        third_name,
        full_name,
        alias_names: raw.list(aliases::ALIAS_NAMES),
        date_of_birth: raw.first(aliases::DATE_OF_BIRTH),
        national_id: raw.first(aliases::NATIONAL_ID).map(|id| id.to_uppercase()),
        nationalities: set_from(raw.list(aliases::NATIONALITY)),
        birth_cities: set_from(raw.list(aliases::BIRTH_CITY)),
        birth_countries: set_from(raw.list(aliases::BIRTH_COUNTRY)),
        address_cities: set_from(raw.list(aliases::ADDRESS_CITY)),
        address_countries: set_from(raw.list(aliases::ADDRESS_COUNTRY)),
        document_types: raw.list(aliases::DOCUMENT_TYPE),
        document_numbers: raw.list(aliases::DOCUMENT_NUMBER),
        document_countries: raw.list(aliases::DOCUMENT_COUNTRY),
        source: ctx.source.clone(),
        source_file: ctx.source_file.clone(),
        import_reference: ctx.import_reference,
        list_source: ctx.list_source,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Map one raw row to a canonical entity
pub fn map_entity(raw: &RawRecord, dialect: Dialect, ctx: &MapContext) -> CanonicalEntity {
    let reference_number = resolve_reference(raw, dialect, ctx, "LSE");

    let now = Utc::now();
    CanonicalEntity {
        reference_number,
        name: raw.first(aliases::ENTITY_NAME).unwrap_or_default(),
        alias_names: raw.list(aliases::ALIAS_NAMES),
        address_lines: raw.list(aliases::ENTITY_ADDRESS),
        address_streets: set_from(raw.list(aliases::ADDRESS_STREET)),
        address_cities: set_from(raw.list(aliases::ADDRESS_CITY)),
        address_countries: set_from(raw.list(aliases::ADDRESS_COUNTRY)),
        source: ctx.source.clone(),
        source_file: ctx.source_file.clone(),
        import_reference: ctx.import_reference,
        list_source: ctx.list_source,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_ctx() -> MapContext {
        MapContext::new(
            Some("bulk-upload".into()),
            Some("list.csv".into()),
            None,
            ListSource::LocalSanctions,
        )
    }

    #[test]
    fn blank_row_maps_to_empty_sets_not_placeholders() {
        let raw = RawRecord::from_pairs(&[
            ("first_name", ""),
            ("nationality", "NA"),
            ("alias_names", "n/a; -"),
            ("document_number", "not available"),
        ]);
        let rec = map_individual(&raw, Dialect::Local, &local_ctx());

        assert!(rec.first_name.is_none());
        assert!(rec.nationalities.is_empty());
        assert!(rec.alias_names.is_empty());
        assert!(rec.document_numbers.is_empty());
        assert_eq!(rec.full_name, "");
    }

    #[test]
    fn combined_name_decomposes_on_whitespace() {
        let raw = RawRecord::from_pairs(&[("name", "Abdul Rahman al Husseini")]);
        let rec = map_individual(&raw, Dialect::External, &local_ctx());

        assert_eq!(rec.first_name.as_deref(), Some("Abdul"));
        assert_eq!(rec.second_name.as_deref(), Some("Rahman"));
        assert_eq!(rec.third_name.as_deref(), Some("al Husseini"));
        assert_eq!(rec.full_name, "Abdul Rahman al Husseini");
    }

    #[test]
    fn surname_falls_back_to_second_name() {
        let raw = RawRecord::from_pairs(&[("first_name", "John"), ("surname", "Doe")]);
        let rec = map_individual(&raw, Dialect::External, &local_ctx());

        assert_eq!(rec.second_name.as_deref(), Some("Doe"));
        assert_eq!(rec.full_name, "John Doe");
    }

    #[test]
    fn national_id_is_upper_cased() {
        let raw = RawRecord::from_pairs(&[("nic", "851234567v")]);
        let rec = map_individual(&raw, Dialect::Local, &local_ctx());
        assert_eq!(rec.national_id.as_deref(), Some("851234567V"));
    }

    #[test]
    fn list_fields_split_on_delimiters() {
        let raw = RawRecord::from_pairs(&[("aliases", "Abu Omar; al-Masri, Abu Omar;")]);
        let rec = map_individual(&raw, Dialect::External, &local_ctx());
        assert_eq!(
            rec.alias_names,
            vec!["Abu Omar".to_string(), "al-Masri".to_string()]
        );
    }

    #[test]
    fn local_reference_passes_through_when_well_formed() {
        let raw = RawRecord::from_pairs(&[("reference_no", "LSI-2024-000123")]);
        let rec = map_individual(&raw, Dialect::Local, &local_ctx());
        assert_eq!(rec.reference_number, "LSI-2024-000123");
    }

    #[test]
    fn out_of_pattern_local_reference_is_synthesized() {
        let ctx = local_ctx();
        let raw = RawRecord::from_pairs(&[("reference_no", "misc-99")]);
        let rec = map_individual(&raw, Dialect::Local, &ctx);

        assert!(rec.reference_number.starts_with("LSI-"));
        assert!(local_reference_kind(&rec.reference_number).is_some());
    }

    #[test]
    fn external_fallback_references_are_distinct() {
        let ctx = MapContext::new(None, None, None, ListSource::ExternalSanctions);
        let raw = RawRecord::from_pairs(&[("first_name", "A")]);
        let a = map_individual(&raw, Dialect::External, &ctx);
        let b = map_individual(&raw, Dialect::External, &ctx);

        assert!(a.reference_number.starts_with("EXT-"));
        assert_ne!(a.reference_number, b.reference_number);
    }

    #[test]
    fn external_reference_passes_through_unchanged() {
        let raw = RawRecord::from_pairs(&[("dataid", "QDi.417")]);
        let rec = map_individual(&raw, Dialect::External, &local_ctx());
        assert_eq!(rec.reference_number, "QDi.417");
    }

    #[test]
    fn entity_maps_name_and_addresses() {
        let raw = RawRecord::from_pairs(&[
            ("entity_name", "Acme Trading LLC"),
            ("address", "12 Harbor Rd; PO Box 99"),
            ("city", "Tripoli"),
            ("country", "Libya"),
        ]);
        let rec = map_entity(&raw, Dialect::External, &local_ctx());

        assert_eq!(rec.name, "Acme Trading LLC");
        assert_eq!(rec.address_lines.len(), 2);
        assert!(rec.address_cities.contains("Tripoli"));
        assert!(rec.address_countries.contains("Libya"));
    }

    #[test]
    fn local_reference_kind_validates_shape() {
        assert_eq!(
            local_reference_kind("LSI-2024-000123"),
            Some(RecordKind::Individual)
        );
        assert_eq!(
            local_reference_kind("LSE-2024-7"),
            Some(RecordKind::Entity)
        );
        assert_eq!(local_reference_kind("LSI-24-000123"), None);
        assert_eq!(local_reference_kind("LSX-2024-000123"), None);
        assert_eq!(local_reference_kind("QDi.417"), None);
    }
}
