//! Room participant roster

use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A connected session member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[async_trait]
pub trait Roster: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Participant>>;
    fn subscribe(&self) -> broadcast::Receiver<Vec<Participant>>;
}

/// Roster held in memory, updated by whoever hosts the room
#[derive(Debug)]
pub struct MemoryRoster {
    participants: Mutex<Vec<Participant>>,
    change_tx: broadcast::Sender<Vec<Participant>>,
}

impl MemoryRoster {
    pub fn new(participants: Vec<Participant>) -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            participants: Mutex::new(participants),
            change_tx,
        }
    }

    /// Replace the roster and notify subscribers
    pub fn replace(&self, participants: Vec<Participant>) {
        if let Ok(mut current) = self.participants.lock() {
            *current = participants.clone();
        }
        let _ = self.change_tx.send(participants);
    }
}

impl Default for MemoryRoster {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Roster for MemoryRoster {
    async fn list(&self) -> anyhow::Result<Vec<Participant>> {
        self.participants
            .lock()
            .map(|participants| participants.clone())
            .map_err(|e| anyhow!("Failed to lock roster: {}", e))
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Participant>> {
        self.change_tx.subscribe()
    }
}
