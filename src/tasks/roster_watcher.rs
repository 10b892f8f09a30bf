//! Task keeping owner names in step with the room roster

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Apply every roster change pushed by the host
pub async fn roster_watcher_task(state: Arc<AppState>) {
    info!("Starting roster watcher");

    let mut changes = state.collaborators.roster.subscribe();
    match state.collaborators.roster.list().await {
        Ok(participants) => state.apply_roster(participants),
        Err(e) => warn!("Failed to list roster: {}", e),
    }

    loop {
        match changes.recv().await {
            Ok(participants) => state.apply_roster(participants),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Roster watcher fell behind by {} updates, relisting", skipped);
                match state.collaborators.roster.list().await {
                    Ok(participants) => state.apply_roster(participants),
                    Err(e) => warn!("Failed to relist roster: {}", e),
                }
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!("Roster feed closed, watcher stopped");
}
