//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    services::OwnerGroup,
    state::{format_remaining, Timer},
};

/// Request body for creating a timer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimerRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub duration_ms: i64,
}

/// Optional owner filter for bulk start/pause
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeQuery {
    pub owner: Option<String>,
}

/// A timer with its derived values at response time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub timer: Timer,
    pub remaining_ms: i64,
    pub remaining: String,
    pub running: bool,
}

impl TimerView {
    pub fn at(timer: Timer, now: i64) -> Self {
        let remaining_ms = timer.remaining(now);
        Self {
            running: timer.is_running(now),
            remaining: format_remaining(remaining_ms),
            remaining_ms,
            timer,
        }
    }
}

/// One owner's row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerView {
    pub key: String,
    pub name: String,
    pub timers: Vec<TimerView>,
}

impl OwnerView {
    pub fn at(group: OwnerGroup, now: i64) -> Self {
        Self {
            key: group.key,
            name: group.name,
            timers: group.timers.into_iter().map(|t| TimerView::at(t, now)).collect(),
        }
    }
}

/// API response structure for timer endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timers: Vec<TimerView>,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, timers: Vec<Timer>, now: i64) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timers: timers.into_iter().map(|t| TimerView::at(t, now)).collect(),
        }
    }

    pub fn ok(message: String, timers: Vec<Timer>, now: i64) -> Self {
        Self::new("ok", message, timers, now)
    }

    pub fn error(message: String) -> Self {
        Self::new("error", message, Vec::new(), 0)
    }
}

/// Room overview with timers grouped per owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub participant: String,
    pub owners: Vec<OwnerView>,
    pub panel_open: bool,
    pub uptime: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
