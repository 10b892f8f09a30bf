//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod alert_listener;
pub mod poll_tick;
pub mod roster_watcher;
pub mod scene_watcher;

use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;

use crate::state::AppState;

// Re-export main functions
pub use alert_listener::alert_listener_task;
pub use poll_tick::poll_task;
pub use roster_watcher::roster_watcher_task;
pub use scene_watcher::scene_watcher_task;

/// Spawn every background task; dropping or shutting down the set stops them all
pub fn spawn_all(state: Arc<AppState>, poll_period: Duration) -> JoinSet<()> {
    let mut tasks = JoinSet::new();
    tasks.spawn(poll_task(Arc::clone(&state), poll_period));
    tasks.spawn(alert_listener_task(Arc::clone(&state)));
    tasks.spawn(roster_watcher_task(Arc::clone(&state)));
    tasks.spawn(scene_watcher_task(state));
    tasks
}
