//! Scene item list used as an optional source of light timers

use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::state::normalize::number_ms;

/// Metadata key marking a scene item as a light source
pub const LIGHT_MARKER_KEY: &str = "light-timers.plugin/light";

/// An item on the scene, reduced to what the timers care about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SceneItem {
    /// A marked light; `Some(duration)` if the marker carries one
    pub fn light_duration(&self) -> Option<Option<i64>> {
        let marker = self.metadata.get(LIGHT_MARKER_KEY)?;
        match marker {
            Value::Null | Value::Bool(false) => None,
            Value::Object(fields) => Some(
                fields
                    .get("durationMs")
                    .and_then(number_ms)
                    .filter(|ms| *ms > 0),
            ),
            _ => Some(None),
        }
    }
}

#[async_trait]
pub trait SceneGraph: Send + Sync {
    /// Item list snapshots, one per scene change
    fn subscribe(&self) -> broadcast::Receiver<Vec<SceneItem>>;

    /// Remove the light marker from an item
    async fn clear_light(&self, item_id: &str) -> anyhow::Result<()>;
}

/// Scene kept in memory
#[derive(Debug)]
pub struct MemoryScene {
    items: Mutex<Vec<SceneItem>>,
    change_tx: broadcast::Sender<Vec<SceneItem>>,
}

impl MemoryScene {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            items: Mutex::new(Vec::new()),
            change_tx,
        }
    }

    /// Replace the item list and notify subscribers
    pub fn publish(&self, items: Vec<SceneItem>) {
        if let Ok(mut current) = self.items.lock() {
            *current = items.clone();
        }
        let _ = self.change_tx.send(items);
    }

    pub fn items(&self) -> Vec<SceneItem> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneGraph for MemoryScene {
    fn subscribe(&self) -> broadcast::Receiver<Vec<SceneItem>> {
        self.change_tx.subscribe()
    }

    async fn clear_light(&self, item_id: &str) -> anyhow::Result<()> {
        let snapshot = {
            let mut items = self
                .items
                .lock()
                .map_err(|e| anyhow!("Failed to lock scene: {}", e))?;
            let item = items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| anyhow!("scene item {} no longer exists", item_id))?;
            item.metadata.remove(LIGHT_MARKER_KEY);
            items.clone()
        };
        let _ = self.change_tx.send(snapshot);
        Ok(())
    }
}
