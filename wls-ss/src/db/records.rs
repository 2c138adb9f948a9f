//! Canonical record repository
//!
//! The bulk upload path keys strictly on (reference number, list source):
//! one record per key, updated in place. The feed path keys on a looser
//! composite (reference + alias set + birth year + document numbers) because
//! the feed reuses reference numbers across genuinely distinct records; both
//! behaviors live here side by side.

use super::{decode_list, encode_list, parse_timestamp};
use crate::index::SearchDoc;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use uuid::Uuid;
use wls_common::{
    CanonicalEntity, CanonicalIndividual, Error, ListSource, RecordKind, Result,
};

/// Find an individual by the bulk-path natural key
pub async fn find_individual(
    pool: &SqlitePool,
    reference_number: &str,
    list_source: ListSource,
) -> Result<Option<Uuid>> {
    let guid: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM watchlist_individuals
         WHERE reference_number = ? AND list_source = ?
         ORDER BY created_at LIMIT 1",
    )
    .bind(reference_number)
    .bind(list_source.as_str())
    .fetch_optional(pool)
    .await?;

    guid.map(|g| parse_guid(&g)).transpose()
}

/// Insert a new individual, returning its surrogate key
pub async fn insert_individual(pool: &SqlitePool, record: &CanonicalIndividual) -> Result<Uuid> {
    let guid = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO watchlist_individuals (
            guid, reference_number, list_source,
            first_name, second_name, third_name, full_name, alias_names,
            date_of_birth, national_id,
            nationalities, birth_cities, birth_countries,
            address_cities, address_countries,
            document_types, document_numbers, document_countries,
            source, source_file, import_reference,
            active, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(&record.reference_number)
    .bind(record.list_source.as_str())
    .bind(&record.first_name)
    .bind(&record.second_name)
    .bind(&record.third_name)
    .bind(&record.full_name)
    .bind(encode_list(&record.alias_names)?)
    .bind(&record.date_of_birth)
    .bind(&record.national_id)
    .bind(encode_list(&record.nationalities)?)
    .bind(encode_list(&record.birth_cities)?)
    .bind(encode_list(&record.birth_countries)?)
    .bind(encode_list(&record.address_cities)?)
    .bind(encode_list(&record.address_countries)?)
    .bind(encode_list(&record.document_types)?)
    .bind(encode_list(&record.document_numbers)?)
    .bind(encode_list(&record.document_countries)?)
    .bind(&record.source)
    .bind(&record.source_file)
    .bind(record.import_reference.map(|id| id.to_string()))
    .bind(record.active as i64)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(guid)
}

/// Update an individual in place, preserving its original creation time
pub async fn update_individual(
    pool: &SqlitePool,
    guid: Uuid,
    record: &CanonicalIndividual,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE watchlist_individuals SET
            first_name = ?, second_name = ?, third_name = ?,
            full_name = ?, alias_names = ?,
            date_of_birth = ?, national_id = ?,
            nationalities = ?, birth_cities = ?, birth_countries = ?,
            address_cities = ?, address_countries = ?,
            document_types = ?, document_numbers = ?, document_countries = ?,
            source = ?, source_file = ?, import_reference = ?,
            active = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&record.first_name)
    .bind(&record.second_name)
    .bind(&record.third_name)
    .bind(&record.full_name)
    .bind(encode_list(&record.alias_names)?)
    .bind(&record.date_of_birth)
    .bind(&record.national_id)
    .bind(encode_list(&record.nationalities)?)
    .bind(encode_list(&record.birth_cities)?)
    .bind(encode_list(&record.birth_countries)?)
    .bind(encode_list(&record.address_cities)?)
    .bind(encode_list(&record.address_countries)?)
    .bind(encode_list(&record.document_types)?)
    .bind(encode_list(&record.document_numbers)?)
    .bind(encode_list(&record.document_countries)?)
    .bind(&record.source)
    .bind(&record.source_file)
    .bind(record.import_reference.map(|id| id.to_string()))
    .bind(record.active as i64)
    .bind(Utc::now().to_rfc3339())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Bulk-path write: update the record behind the reference number, or insert
///
/// Returns the surrogate key and whether a new record was created.
pub async fn upsert_individual(
    pool: &SqlitePool,
    record: &CanonicalIndividual,
) -> Result<(Uuid, bool)> {
    match find_individual(pool, &record.reference_number, record.list_source).await? {
        Some(guid) => {
            update_individual(pool, guid, record).await?;
            Ok((guid, false))
        }
        None => Ok((insert_individual(pool, record).await?, true)),
    }
}

/// Feed-path lookup on the composite identity key
///
/// Candidates share the reference number; the distinguishing fields (alias
/// set, birth year, document numbers) are compared in code against the
/// decoded columns.
pub async fn find_individual_composite(
    pool: &SqlitePool,
    record: &CanonicalIndividual,
) -> Result<Option<Uuid>> {
    let rows = sqlx::query(
        "SELECT guid, alias_names, date_of_birth, document_numbers
         FROM watchlist_individuals
         WHERE reference_number = ? AND list_source = ?",
    )
    .bind(&record.reference_number)
    .bind(record.list_source.as_str())
    .fetch_all(pool)
    .await?;

    let wanted_aliases: BTreeSet<String> = record.alias_names.iter().cloned().collect();
    let wanted_year = birth_year(record.date_of_birth.as_deref());
    let wanted_docs: BTreeSet<String> = record.document_numbers.iter().cloned().collect();

    for row in rows {
        let aliases: Vec<String> = decode_list(&row.get::<String, _>("alias_names"))?;
        let aliases: BTreeSet<String> = aliases.into_iter().collect();
        let dob: Option<String> = row.get("date_of_birth");
        let docs: Vec<String> = decode_list(&row.get::<String, _>("document_numbers"))?;
        let docs: BTreeSet<String> = docs.into_iter().collect();

        if aliases == wanted_aliases
            && birth_year(dob.as_deref()) == wanted_year
            && docs == wanted_docs
        {
            return Ok(Some(parse_guid(&row.get::<String, _>("guid"))?));
        }
    }
    Ok(None)
}

/// Find an entity by the bulk-path natural key
pub async fn find_entity(
    pool: &SqlitePool,
    reference_number: &str,
    list_source: ListSource,
) -> Result<Option<Uuid>> {
    let guid: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM watchlist_entities
         WHERE reference_number = ? AND list_source = ?
         ORDER BY created_at LIMIT 1",
    )
    .bind(reference_number)
    .bind(list_source.as_str())
    .fetch_optional(pool)
    .await?;

    guid.map(|g| parse_guid(&g)).transpose()
}

pub async fn insert_entity(pool: &SqlitePool, record: &CanonicalEntity) -> Result<Uuid> {
    let guid = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO watchlist_entities (
            guid, reference_number, list_source, name, alias_names,
            address_lines, address_streets, address_cities, address_countries,
            source, source_file, import_reference,
            active, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(&record.reference_number)
    .bind(record.list_source.as_str())
    .bind(&record.name)
    .bind(encode_list(&record.alias_names)?)
    .bind(encode_list(&record.address_lines)?)
    .bind(encode_list(&record.address_streets)?)
    .bind(encode_list(&record.address_cities)?)
    .bind(encode_list(&record.address_countries)?)
    .bind(&record.source)
    .bind(&record.source_file)
    .bind(record.import_reference.map(|id| id.to_string()))
    .bind(record.active as i64)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(guid)
}

pub async fn update_entity(pool: &SqlitePool, guid: Uuid, record: &CanonicalEntity) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE watchlist_entities SET
            name = ?, alias_names = ?,
            address_lines = ?, address_streets = ?, address_cities = ?, address_countries = ?,
            source = ?, source_file = ?, import_reference = ?,
            active = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&record.name)
    .bind(encode_list(&record.alias_names)?)
    .bind(encode_list(&record.address_lines)?)
    .bind(encode_list(&record.address_streets)?)
    .bind(encode_list(&record.address_cities)?)
    .bind(encode_list(&record.address_countries)?)
    .bind(&record.source)
    .bind(&record.source_file)
    .bind(record.import_reference.map(|id| id.to_string()))
    .bind(record.active as i64)
    .bind(Utc::now().to_rfc3339())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn upsert_entity(pool: &SqlitePool, record: &CanonicalEntity) -> Result<(Uuid, bool)> {
    match find_entity(pool, &record.reference_number, record.list_source).await? {
        Some(guid) => {
            update_entity(pool, guid, record).await?;
            Ok((guid, false))
        }
        None => Ok((insert_entity(pool, record).await?, true)),
    }
}

/// Feed-path composite lookup for entities: reference + name + alias set
pub async fn find_entity_composite(
    pool: &SqlitePool,
    record: &CanonicalEntity,
) -> Result<Option<Uuid>> {
    let rows = sqlx::query(
        "SELECT guid, name, alias_names FROM watchlist_entities
         WHERE reference_number = ? AND list_source = ?",
    )
    .bind(&record.reference_number)
    .bind(record.list_source.as_str())
    .fetch_all(pool)
    .await?;

    let wanted_aliases: BTreeSet<String> = record.alias_names.iter().cloned().collect();

    for row in rows {
        let name: String = row.get("name");
        let aliases: Vec<String> = decode_list(&row.get::<String, _>("alias_names"))?;
        let aliases: BTreeSet<String> = aliases.into_iter().collect();

        if name == record.name && aliases == wanted_aliases {
            return Ok(Some(parse_guid(&row.get::<String, _>("guid"))?));
        }
    }
    Ok(None)
}

/// Load every record as a search document, for embedded-index rebuilds
pub async fn all_search_docs(pool: &SqlitePool) -> Result<Vec<SearchDoc>> {
    let mut docs = Vec::new();

    let rows = sqlx::query(
        "SELECT guid, reference_number, list_source,
                first_name, second_name, third_name, full_name, alias_names, created_at
         FROM watchlist_individuals WHERE active = 1",
    )
    .fetch_all(pool)
    .await?;
    for row in rows {
        let parts: Vec<Option<String>> = vec![
            row.get("first_name"),
            row.get("second_name"),
            row.get("third_name"),
        ];
        let joined = parts
            .iter()
            .filter_map(|p| p.as_deref())
            .collect::<Vec<_>>()
            .join(" ");
        let full_name = if joined.is_empty() {
            row.get::<String, _>("full_name")
        } else {
            joined
        };

        docs.push(SearchDoc {
            id: row.get("guid"),
            kind: RecordKind::Individual,
            reference_number: row.get("reference_number"),
            full_name,
            alias_names: decode_list(&row.get::<String, _>("alias_names"))?,
            list_source: ListSource::parse(&row.get::<String, _>("list_source")),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        });
    }

    let rows = sqlx::query(
        "SELECT guid, reference_number, list_source, name, alias_names, created_at
         FROM watchlist_entities WHERE active = 1",
    )
    .fetch_all(pool)
    .await?;
    for row in rows {
        docs.push(SearchDoc {
            id: row.get("guid"),
            kind: RecordKind::Entity,
            reference_number: row.get("reference_number"),
            full_name: row.get("name"),
            alias_names: decode_list(&row.get::<String, _>("alias_names"))?,
            list_source: ListSource::parse(&row.get::<String, _>("list_source")),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        });
    }

    Ok(docs)
}

/// Most recent record update across both tables, for status reporting
pub async fn latest_update(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let individual: Option<String> =
        sqlx::query_scalar("SELECT MAX(updated_at) FROM watchlist_individuals")
            .fetch_one(pool)
            .await?;
    let entity: Option<String> =
        sqlx::query_scalar("SELECT MAX(updated_at) FROM watchlist_entities")
            .fetch_one(pool)
            .await?;

    let mut latest = None;
    for text in [individual, entity].into_iter().flatten() {
        let ts = parse_timestamp(&text)?;
        if latest.map_or(true, |current| ts > current) {
            latest = Some(ts);
        }
    }
    Ok(latest)
}

/// Birth year is the leading four digits of the date-of-birth string
fn birth_year(dob: Option<&str>) -> Option<String> {
    let dob = dob?;
    let year: String = dob.chars().take(4).collect();
    (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
}

fn parse_guid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn birth_year_extracts_leading_digits() {
        assert_eq!(birth_year(Some("1984-02-01")), Some("1984".to_string()));
        assert_eq!(birth_year(Some("approx. 1984")), None);
        assert_eq!(birth_year(None), None);
    }
}
