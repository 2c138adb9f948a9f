//! Configuration resolution for the screening service
//!
//! Values resolve in priority order:
//! 1. Environment variable (highest)
//! 2. TOML config file (`~/.config/wls/config.toml`, then `/etc/wls/config.toml`)
//! 3. Compiled default

use crate::{Error, Result};
use std::path::PathBuf;

/// Resolved service configuration
///
/// Carried by value through the service; the search index name in particular
/// is passed explicitly into the indexer and the search engine at call time
/// rather than living in module state.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Remote consolidated-feed endpoint; periodic sync is disabled when unset
    pub feed_url: Option<String>,
    /// Wall-clock interval between feed syncs
    pub sync_interval_secs: u64,
    /// Search service base URL; the embedded in-process index is used when unset
    pub search_url: Option<String>,
    /// Name of the search index all documents are written to
    pub search_index: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5731,
            database_path: PathBuf::from("wls.db"),
            feed_url: None,
            sync_interval_secs: 3600,
            search_url: None,
            search_index: "watchlist".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from environment, config file, and defaults
    pub fn resolve() -> Result<Self> {
        let file = load_config_file();
        let mut config = ServiceConfig::default();

        if let Some(port) = resolve_value("WLS_PORT", &file, "port") {
            config.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid port: {}", port)))?;
        }
        if let Some(path) = resolve_value("WLS_DATABASE_PATH", &file, "database_path") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(url) = resolve_value("WLS_FEED_URL", &file, "feed_url") {
            config.feed_url = Some(url);
        }
        if let Some(secs) = resolve_value("WLS_SYNC_INTERVAL_SECS", &file, "sync_interval_secs") {
            config.sync_interval_secs = secs
                .parse()
                .map_err(|_| Error::Config(format!("invalid sync interval: {}", secs)))?;
        }
        if let Some(url) = resolve_value("WLS_SEARCH_URL", &file, "search_url") {
            config.search_url = Some(url);
        }
        if let Some(name) = resolve_value("WLS_SEARCH_INDEX", &file, "search_index") {
            config.search_index = name;
        }

        Ok(config)
    }
}

/// Look a key up in the environment first, then the loaded config file
fn resolve_value(env_var: &str, file: &Option<toml::Value>, key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }

    file.as_ref()
        .and_then(|config| config.get(key))
        .and_then(|v| match v {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            _ => None,
        })
}

/// Load the first readable config file, if any
fn load_config_file() -> Option<toml::Value> {
    for path in candidate_config_paths() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            match toml::from_str::<toml::Value>(&content) {
                Ok(value) => {
                    tracing::debug!(path = %path.display(), "Loaded config file");
                    return Some(value);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unparseable config file");
                }
            }
        }
    }
    None
}

fn candidate_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("wls").join("config.toml"));
    }
    paths.push(PathBuf::from("/etc/wls/config.toml"));
    paths
}
