//! # WLS Common Library
//!
//! Shared code for the watchlist screening service:
//! - Canonical record and import-job models
//! - Error types
//! - Configuration resolution
//! - Database pool and table initialization

pub mod config;
pub mod db;
pub mod error;
pub mod records;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use records::{
    CanonicalEntity, CanonicalIndividual, ImportJob, ImportStatus, ListSource, RecordKind,
};
