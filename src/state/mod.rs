//! State management module
//! 
//! This module contains the timer model, validation of stored records, the
//! burn-out detector and the per-client application state.

pub mod app_state;
pub mod detector;
pub mod normalize;
pub mod timer;

// Re-export main types
pub use app_state::{AppState, ClientSettings, Collaborators, DEFAULT_STORE_KEY};
pub use detector::{Crossing, TransitionDetector};
pub use timer::{format_remaining, Timer};
