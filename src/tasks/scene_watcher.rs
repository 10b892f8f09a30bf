//! Task creating timers for lights placed on the scene

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Watch scene snapshots and create a timer per newly marked light
pub async fn scene_watcher_task(state: Arc<AppState>) {
    let Some(scene) = state.collaborators.scene.clone() else {
        return;
    };
    info!("Starting scene watcher");

    let mut snapshots = scene.subscribe();
    loop {
        match snapshots.recv().await {
            Ok(items) => {
                let created = state.handle_scene(&items).await;
                if created > 0 {
                    info!("Created {} timers from scene lights", created);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Scene watcher fell behind by {} snapshots", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!("Scene feed closed, watcher stopped");
}
