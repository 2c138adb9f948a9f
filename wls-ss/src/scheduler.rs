//! Periodic feed synchronization
//!
//! One tokio task drives the feed path: an immediate first sync, then a
//! fixed wall-clock interval forever. Syncs are single-flight — the guard
//! shared with the manual trigger is try-locked per tick, and an
//! overlapping tick is skipped and logged rather than raced.

use crate::ingest::{FeedClient, FeedSynchronizer};
use crate::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the periodic sync task
///
/// Returns None (with a warning) when no feed URL is configured.
pub fn start(state: AppState) -> Option<JoinHandle<()>> {
    let Some(feed_url) = state.config.feed_url.clone() else {
        tracing::warn!("Feed URL not configured; periodic sync disabled");
        return None;
    };

    let client = match FeedClient::new(&feed_url) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Could not build feed client; periodic sync disabled");
            return None;
        }
    };

    let interval = Duration::from_secs(state.config.sync_interval_secs.max(1));
    tracing::info!(
        url = %feed_url,
        interval_secs = interval.as_secs(),
        "Starting feed scheduler"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            // First tick completes immediately
            ticker.tick().await;
            run_once(&state, &client).await;
        }
    }))
}

/// Run one guarded sync; a held guard means a sync is already in flight
pub async fn run_once(state: &AppState, client: &FeedClient) {
    match state.sync_guard.try_lock() {
        Ok(_guard) => {
            let sync = FeedSynchronizer::new(
                state.db.clone(),
                state.search.clone(),
                state.config.search_index.clone(),
                client.clone(),
            );
            match sync.sync().await {
                Ok(report) => tracing::info!(
                    individuals = report.individuals_added,
                    entities = report.entities_added,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Scheduled feed sync finished"
                ),
                // The next tick still fires; connection setup restarts from
                // scratch on every invocation.
                Err(e) => tracing::warn!(error = %e, "Scheduled feed sync failed"),
            }
        }
        Err(_) => {
            tracing::warn!("Previous feed sync still running; skipping this tick");
        }
    }
}
