//! Format detection for ingested batches
//!
//! Classification runs once per batch against a sample row (batches are
//! homogeneous), in priority order: a recognized local reference prefix
//! decides deterministically; otherwise indicator-header counting decides,
//! with ties favoring Individual.

use super::{aliases, local_reference_kind, Dialect, RawRecord};
use wls_common::RecordKind;

/// Classify a sample row as individual or entity
pub fn detect_record_kind(sample: &RawRecord) -> RecordKind {
    if let Some(kind) = sample
        .first(aliases::REFERENCE)
        .and_then(|reference| local_reference_kind(&reference))
    {
        return kind;
    }

    let individual_hits = count_hits(sample, aliases::INDIVIDUAL_INDICATORS);
    let entity_hits = count_hits(sample, aliases::ENTITY_INDICATORS);

    if sample.is_empty() {
        tracing::warn!("Empty sample row; defaulting record kind to individual");
    }

    // Ties favor Individual
    if entity_hits > individual_hits {
        RecordKind::Entity
    } else {
        RecordKind::Individual
    }
}

/// Classify a sample row as local or external dialect
pub fn detect_dialect(sample: &RawRecord) -> Dialect {
    match sample.first(aliases::REFERENCE) {
        Some(reference) if local_reference_kind(&reference).is_some() => Dialect::Local,
        Some(_) => Dialect::External,
        // Empty batches default to Local; the CSV path rejects zero-row
        // files before detection, so this only matters for direct callers.
        None => Dialect::Local,
    }
}

fn count_hits(sample: &RawRecord, indicators: &[&str]) -> usize {
    indicators
        .iter()
        .filter(|name| sample.has_field(name))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dob_and_nic_row_is_individual() {
        let raw = RawRecord::from_pairs(&[
            ("name", "John Doe"),
            ("dob", "1984-02-01"),
            ("nic", "841234567V"),
        ]);
        assert_eq!(detect_record_kind(&raw), RecordKind::Individual);
    }

    #[test]
    fn organization_headers_win_for_entities() {
        let raw = RawRecord::from_pairs(&[
            ("organization_name", "Acme Trading LLC"),
            ("entity_address", "12 Harbor Rd"),
            ("country", "Libya"),
        ]);
        assert_eq!(detect_record_kind(&raw), RecordKind::Entity);
    }

    #[test]
    fn tie_favors_individual() {
        let raw = RawRecord::from_pairs(&[("reference_no", "QDi.417")]);
        assert_eq!(detect_record_kind(&raw), RecordKind::Individual);
    }

    #[test]
    fn local_prefix_decides_deterministically() {
        // An LSE- reference overrides indicator counting entirely
        let raw = RawRecord::from_pairs(&[
            ("reference_no", "LSE-2024-000007"),
            ("first_name", "ignored"),
            ("dob", "ignored"),
        ]);
        assert_eq!(detect_record_kind(&raw), RecordKind::Entity);
        assert_eq!(detect_dialect(&raw), Dialect::Local);
    }

    #[test]
    fn foreign_reference_means_external_dialect() {
        let raw = RawRecord::from_pairs(&[("reference_no", "QDi.417")]);
        assert_eq!(detect_dialect(&raw), Dialect::External);
    }

    #[test]
    fn empty_sample_defaults_to_individual_local() {
        let raw = RawRecord::default();
        assert_eq!(detect_record_kind(&raw), RecordKind::Individual);
        assert_eq!(detect_dialect(&raw), Dialect::Local);
    }
}
