//! Timer record and the time math derived from it

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Duration used for legacy records that never stored one (one hour)
pub const DEFAULT_DURATION_MS: i64 = 60 * 60 * 1000;

/// Shortest duration a participant may set
pub const MIN_DURATION_MS: i64 = 1000;

/// Longest duration accepted (one year)
pub const MAX_DURATION_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Largest absolute epoch timestamp a host clock can produce
pub const MAX_TIMESTAMP_MS: i64 = 8_640_000_000_000_000;

/// Owner label used when a record carries neither an owner id nor a name
pub const UNKNOWN_OWNER: &str = "Unknown";

/// One light source countdown as stored in the room blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<i64>,
    #[serde(default)]
    pub offset_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_link_id: Option<String>,
}

impl Timer {
    /// Create a timer that starts burning at `now`
    pub fn new(name: Option<String>, duration_ms: i64, now: i64) -> Self {
        Self {
            id: generate_id(),
            name,
            duration_ms,
            start_at: Some(now),
            paused_at: None,
            offset_ms: 0,
            owner_id: None,
            owner_name: None,
            external_link_id: None,
        }
    }

    /// Attach the acting participant as owner
    pub fn owned_by(mut self, owner_id: impl Into<String>, owner_name: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self.owner_name = Some(owner_name.into());
        self
    }

    /// Link this timer to a scene item
    pub fn linked_to(mut self, external_link_id: impl Into<String>) -> Self {
        self.external_link_id = Some(external_link_id.into());
        self
    }

    /// True while the current run segment is counting (started, not paused)
    pub fn is_live(&self) -> bool {
        self.start_at.is_some() && self.paused_at.is_none()
    }

    /// Total burnt time at `now`
    pub fn elapsed(&self, now: i64) -> i64 {
        let banked = self.offset_ms.max(0);
        match self.start_at {
            Some(start_at) if self.paused_at.is_none() => {
                banked.saturating_add(now.saturating_sub(start_at).max(0))
            }
            _ => banked,
        }
    }

    /// Time left at `now`, never negative
    pub fn remaining(&self, now: i64) -> i64 {
        self.duration_ms.saturating_sub(self.elapsed(now)).max(0)
    }

    /// Running means live and not yet burnt out
    pub fn is_running(&self, now: i64) -> bool {
        self.is_live() && self.remaining(now) > 0
    }

    /// Grouping key: owner id, else a key derived from the owner name
    pub fn owner_key(&self) -> String {
        match (&self.owner_id, &self.owner_name) {
            (Some(id), _) if !id.is_empty() => id.clone(),
            (_, Some(name)) if !name.is_empty() => format!("name:{}", name),
            _ => format!("name:{}", UNKNOWN_OWNER),
        }
    }

    /// Label shown for the owner
    pub fn owner_label(&self) -> &str {
        self.owner_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_OWNER)
    }

    /// Label shown for the timer
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("Light")
    }
}

/// Fresh random identifier for a new timer
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format milliseconds as `M:SS`, rounding partial seconds up
pub fn format_remaining(ms: i64) -> String {
    let ms = ms.max(0);
    let total_seconds = ms / 1000 + i64::from(ms % 1000 != 0);
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
