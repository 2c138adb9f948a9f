//! wls-ss - Watchlist Screening Service
//!
//! Ingests consolidated sanctions/blocklists from a remote structured feed
//! and ad-hoc bulk uploads, normalizes them into canonical records, and
//! serves fuzzy name screening over a full-text index.

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wls_common::ServiceConfig;

use wls_ss::index::{HttpSearchIndex, MemoryIndex, SearchBackend};
use wls_ss::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting wls-ss (Watchlist Screening) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::resolve()?;
    info!("Database: {}", config.database_path.display());

    let db = wls_common::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    // Jobs left mid-flight by a previous run will never finish
    let swept = wls_ss::db::jobs::fail_stale_jobs(&db).await?;
    if swept > 0 {
        warn!(swept, "Failed stale import jobs from a previous run");
    }

    let search = match &config.search_url {
        Some(url) => {
            info!(url = %url, "Using HTTP search backend");
            SearchBackend::Http(HttpSearchIndex::new(url)?)
        }
        None => {
            info!("No search URL configured; using embedded index");
            SearchBackend::Memory(MemoryIndex::new())
        }
    };

    // The index is a best-effort projection; an unreachable search service
    // must not keep the store and the upload surface down.
    if let Err(e) = search.ensure_index(&config.search_index).await {
        warn!(error = %e, "Could not ensure search index; continuing");
    }

    // The embedded index is empty at boot; rebuild it from the store
    if matches!(search, SearchBackend::Memory(_)) {
        let docs = wls_ss::db::records::all_search_docs(&db).await?;
        if !docs.is_empty() {
            if let Err(e) = search.bulk_index(&config.search_index, &docs).await {
                warn!(error = %e, "Embedded index rebuild failed");
            } else {
                info!(documents = docs.len(), "Rebuilt embedded search index");
            }
        }
    }

    let port = config.port;
    let state = AppState::new(db, search, config);

    wls_ss::scheduler::start(state.clone());

    let app = wls_ss::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
