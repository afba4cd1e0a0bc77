//! Tracing setup and the sync event log sink

use crate::types::SyncEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Logs one sync event
pub fn log_sync_event(event: &SyncEvent) {
    match event {
        SyncEvent::CycleCompleted {
            id,
            job,
            duration_ms,
            report,
            ..
        } => tracing::info!(
            event_id = %id,
            job = %job,
            duration_ms,
            fetched = report.fetched,
            cached = report.cached,
            updated = report.updated,
            created = report.created,
            unmatched = report.unmatched,
            "Sync cycle completed"
        ),
        SyncEvent::CycleFailed {
            id,
            job,
            duration_ms,
            error_message,
            ..
        } => tracing::error!(
            event_id = %id,
            job = %job,
            duration_ms,
            error = %error_message,
            "Sync cycle failed"
        ),
    }
}

/// Spawns a task logging every event received on `events`
pub fn spawn_event_logger(mut events: broadcast::Receiver<SyncEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_sync_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Sync event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
