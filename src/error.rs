//! Error types for timer operations

use thiserror::Error;

/// Failure of a user-initiated timer operation
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("duration must be at least 1000 ms, got {got} ms")]
    DurationTooShort { got: i64 },

    #[error("duration must be at most {max} ms, got {got} ms")]
    DurationTooLong { got: i64, max: i64 },

    #[error("store access failed: {0}")]
    Store(#[from] anyhow::Error),

    #[error("store kept changing underneath us after {attempts} attempts")]
    Conflict { attempts: usize },

    #[error("failed to encode timers: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type TimerResult<T> = Result<T, TimerError>;
