//! Task relaying burn-out alerts broadcast by other clients

use std::sync::Arc;
use tracing::{debug, info};

use crate::{services::ALERT_CHANNEL, state::AppState};

/// Show alerts other clients detected, skipping ones already handled here
pub async fn alert_listener_task(state: Arc<AppState>) {
    info!("Starting alert listener on {}", ALERT_CHANNEL);

    let mut messages = state.collaborators.pubsub.subscribe(ALERT_CHANNEL);
    while let Some(payload) = messages.recv().await {
        if state.handle_alert(payload).await {
            debug!("Relayed a burn-out alert from another client");
        }
    }

    info!("Alert channel closed, listener stopped");
}
