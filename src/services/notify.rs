//! Notification toasts and the action badge

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Default,
    Info,
    Success,
    Warning,
    Error,
}

/// Toast-style user notification
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, message: &str, severity: Severity) -> anyhow::Result<()>;
}

/// Small text badge on the plugin's toolbar button
#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_text(&self, text: Option<String>) -> anyhow::Result<()>;
    async fn set_color(&self, color: &str) -> anyhow::Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn show(&self, message: &str, severity: Severity) -> anyhow::Result<()> {
        match severity {
            Severity::Warning | Severity::Error => warn!("[notification] {}", message),
            _ => info!("[notification] {}", message),
        }
        Ok(())
    }
}

/// Writes badge updates to the log
#[derive(Debug, Default)]
pub struct LogBadge;

#[async_trait]
impl BadgeSink for LogBadge {
    async fn set_text(&self, text: Option<String>) -> anyhow::Result<()> {
        match text {
            Some(text) => info!("[badge] {}", text),
            None => info!("[badge] cleared"),
        }
        Ok(())
    }

    async fn set_color(&self, color: &str) -> anyhow::Result<()> {
        info!("[badge] color {}", color);
        Ok(())
    }
}

/// Keeps every notification shown, for inspection
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    shown: Mutex<Vec<(String, Severity)>>,
}

impl MemoryNotifier {
    pub fn shown(&self) -> Vec<(String, Severity)> {
        self.shown.lock().map(|shown| shown.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotifier {
    async fn show(&self, message: &str, severity: Severity) -> anyhow::Result<()> {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push((message.to_string(), severity));
        }
        Ok(())
    }
}

/// Keeps the current badge text and color
#[derive(Debug, Default)]
pub struct MemoryBadge {
    text: Mutex<Option<String>>,
    color: Mutex<Option<String>>,
    updates: Mutex<usize>,
}

impl MemoryBadge {
    pub fn text(&self) -> Option<String> {
        self.text.lock().ok().and_then(|text| text.clone())
    }

    pub fn color(&self) -> Option<String> {
        self.color.lock().ok().and_then(|color| color.clone())
    }

    /// Number of `set_text` calls received
    pub fn updates(&self) -> usize {
        self.updates.lock().map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl BadgeSink for MemoryBadge {
    async fn set_text(&self, text: Option<String>) -> anyhow::Result<()> {
        if let Ok(mut current) = self.text.lock() {
            *current = text;
        }
        if let Ok(mut updates) = self.updates.lock() {
            *updates += 1;
        }
        Ok(())
    }

    async fn set_color(&self, color: &str) -> anyhow::Result<()> {
        if let Ok(mut current) = self.color.lock() {
            *current = Some(color.to_string());
        }
        Ok(())
    }
}
