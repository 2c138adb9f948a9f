//! Ordered source-column alias tables
//!
//! Every canonical field resolves through one of these lists, tried in
//! order against normalized header names. Adding support for a new source
//! column is a table edit, not a control-flow change.

/// Reference-number candidates, shared by both record kinds
pub const REFERENCE: &[&str] = &[
    "reference_number",
    "reference_no",
    "ref_no",
    "ref",
    "dataid",
    "reference",
];

pub const FIRST_NAME: &[&str] = &["first_name", "firstname", "given_name", "name1"];

/// Surname doubles as the second name part in several source files
pub const SECOND_NAME: &[&str] = &["second_name", "surname", "last_name", "lastname", "name2"];

pub const THIRD_NAME: &[&str] = &["third_name", "middle_name", "other_name", "name3"];

pub const FULL_NAME: &[&str] = &["full_name", "fullname", "individual_name", "name"];

pub const ALIAS_NAMES: &[&str] = &[
    "alias_names",
    "aliases",
    "alias",
    "aka",
    "individual_alias",
    "also_known_as",
];

pub const DATE_OF_BIRTH: &[&str] = &["date_of_birth", "dob", "birth_date", "birthdate"];

pub const NATIONAL_ID: &[&str] = &[
    "national_id",
    "nic",
    "national_identity_no",
    "national_identification_no",
    "nid",
];

pub const NATIONALITY: &[&str] = &["nationality", "nationalities", "citizenship"];

pub const BIRTH_CITY: &[&str] = &["birth_city", "place_of_birth_city", "pob_city"];

pub const BIRTH_COUNTRY: &[&str] = &["birth_country", "place_of_birth_country", "pob_country"];

pub const ADDRESS_CITY: &[&str] = &["address_city", "city", "town"];

pub const ADDRESS_COUNTRY: &[&str] = &["address_country", "country"];

pub const DOCUMENT_TYPE: &[&str] = &["document_type", "doc_type", "type_of_document"];

pub const DOCUMENT_NUMBER: &[&str] = &[
    "document_number",
    "doc_number",
    "passport_no",
    "passport_number",
    "number",
];

pub const DOCUMENT_COUNTRY: &[&str] = &[
    "document_country",
    "issuing_country",
    "doc_issuing_country",
];

pub const ENTITY_NAME: &[&str] = &[
    "entity_name",
    "organization_name",
    "organisation_name",
    "company_name",
    "name",
];

pub const ENTITY_ADDRESS: &[&str] = &["address", "address_line", "entity_address"];

pub const ADDRESS_STREET: &[&str] = &["street", "address_street"];

/// Headers whose presence indicates an individual row (detection rule b)
pub const INDIVIDUAL_INDICATORS: &[&str] = &[
    "first_name",
    "firstname",
    "given_name",
    "second_name",
    "surname",
    "last_name",
    "third_name",
    "date_of_birth",
    "dob",
    "birth_date",
    "national_id",
    "nic",
    "national_identity_no",
];

/// Headers whose presence indicates an entity row (detection rule b)
pub const ENTITY_INDICATORS: &[&str] = &[
    "entity_name",
    "organization_name",
    "organisation_name",
    "company_name",
    "entity_address",
];
