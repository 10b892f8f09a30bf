//! Best-effort broadcast channel between clients in a room

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// Who receives a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BroadcastScope {
    /// Only this client
    Local,
    /// Every other client
    Remote,
    /// Everyone, sender included
    All,
}

/// Fan-out messaging; no ordering or delivery guarantee
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn send(&self, channel: &str, payload: Value, scope: BroadcastScope) -> anyhow::Result<()>;
    fn subscribe(&self, channel: &str) -> mpsc::UnboundedReceiver<Value>;
}

struct Subscriber {
    client_id: String,
    channel: String,
    tx: mpsc::UnboundedSender<Value>,
}

/// Shared in-process hub that several clients connect to
#[derive(Default)]
pub struct PubSubHub {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl PubSubHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Endpoint for one client
    pub fn connect(self: &Arc<Self>, client_id: impl Into<String>) -> MemoryPubSub {
        MemoryPubSub {
            hub: Arc::clone(self),
            client_id: client_id.into(),
        }
    }
}

/// One client's view of a [`PubSubHub`]
#[derive(Clone)]
pub struct MemoryPubSub {
    hub: Arc<PubSubHub>,
    client_id: String,
}

#[async_trait]
impl PubSub for MemoryPubSub {
    async fn send(&self, channel: &str, payload: Value, scope: BroadcastScope) -> anyhow::Result<()> {
        let mut subscribers = self
            .hub
            .subscribers
            .lock()
            .map_err(|e| anyhow!("Failed to lock broadcast hub: {}", e))?;

        // Drop receivers that went away
        subscribers.retain(|subscriber| !subscriber.tx.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| s.channel == channel) {
            let is_self = subscriber.client_id == self.client_id;
            let wanted = match scope {
                BroadcastScope::Local => is_self,
                BroadcastScope::Remote => !is_self,
                BroadcastScope::All => true,
            };
            if wanted && subscriber.tx.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }

        debug!("Broadcast on {} reached {} subscribers", channel, delivered);
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.hub.subscribers.lock() {
            subscribers.push(Subscriber {
                client_id: self.client_id.clone(),
                channel: channel.to_string(),
                tx,
            });
        }
        rx
    }
}
