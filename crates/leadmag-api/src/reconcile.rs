//! Conversion reconciliation
//!
//! Documents can end up with a stored PDF but no derived HTML when a
//! conversion attempt failed after the row insert. This task periodically
//! retries those rows end-to-end.

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

const BATCH_SIZE: i64 = 50;

/// Spawn the background reconciliation loop. Disabled when the configured
/// interval is zero.
pub fn spawn_reconciler(state: Arc<AppState>) {
    let interval_secs = state.config.reconcile_interval_seconds();
    if interval_secs == 0 {
        tracing::info!("Reconciliation disabled (RECONCILE_INTERVAL_SECONDS=0)");
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet
        interval.tick().await;

        loop {
            interval.tick().await;
            run_pass(&state).await;
        }
    });

    tracing::info!(
        interval_seconds = interval_secs,
        "Reconciliation task started"
    );
}

async fn run_pass(state: &Arc<AppState>) {
    let documents = match state.documents.list_unconverted(BATCH_SIZE).await {
        Ok(documents) => documents,
        Err(e) => {
            tracing::warn!(error = %e, "reconciliation pass failed to list documents");
            return;
        }
    };

    if documents.is_empty() {
        return;
    }

    tracing::info!(count = documents.len(), "reconciling unconverted documents");

    for document in documents {
        match state.uploads.convert_document(&document).await {
            Ok(_) => {
                tracing::info!(document_id = %document.id, "reconciled document");
            }
            Err(e) => {
                tracing::warn!(
                    document_id = %document.id,
                    error = %e.0,
                    "reconciliation attempt failed"
                );
            }
        }
    }
}
