//! Polling task that re-evaluates every timer on a fixed interval

use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast::error::RecvError, task::JoinSet, time::MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Re-evaluate timers every `period`, and right away when the room list changes
///
/// Expiry cleanups run in a set owned by this task, so aborting the task
/// aborts any cleanup still in flight.
pub async fn poll_task(state: Arc<AppState>, period: Duration) {
    info!("Starting timer poll task ({} ms interval)", period.as_millis());

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut changes = state.collaborators.store.subscribe();
    let mut cleanups: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            Some(result) = cleanups.join_next() => {
                if let Err(e) = result {
                    warn!("Timer cleanup task failed: {}", e);
                }
                continue;
            }
            change = changes.recv() => match change {
                Ok(metadata) => {
                    if !metadata.contains_key(state.reconciler.key()) {
                        continue;
                    }
                    debug!("Room timers changed, re-evaluating");
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Missed {} store change notifications", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Store change feed closed, resubscribing");
                    changes = state.collaborators.store.subscribe();
                    interval.tick().await;
                    continue;
                }
            },
        }

        match state.tick().await {
            Ok(crossings) => {
                for crossing in crossings {
                    // Cleanup writes must not hold up the next tick
                    let state = Arc::clone(&state);
                    cleanups.spawn(async move {
                        state.expire(&crossing).await;
                    });
                }
            }
            Err(e) => error!("Timer poll failed: {}", e),
        }
    }
}
