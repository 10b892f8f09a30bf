//! Light Timers - shared light-source countdowns for a virtual tabletop room
//! 
//! Every participant sees the same torches, lanterns and spells burning down.
//! Timers live in the room's metadata store, each client polls them locally,
//! detects burn-outs exactly once and relays the alert to the rest of the room.

pub mod config;
pub mod error;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{TimerError, TimerResult};
pub use state::{AppState, Timer};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
