//! Shared setup: a room of clients backed by in-memory host services

#![allow(dead_code)]

use std::sync::Arc;

use light_timers::{
    services::{MemoryBadge, MemoryBlobStore, MemoryNotifier, MemoryRoster, MemoryScene, Participant, PubSubHub, SceneGraph},
    state::{AppState, ClientSettings, Collaborators},
    utils::ManualClock,
};

/// Services shared by everyone in the room
pub struct Room {
    pub store: Arc<MemoryBlobStore>,
    pub roster: Arc<MemoryRoster>,
    pub hub: Arc<PubSubHub>,
    pub scene: Arc<MemoryScene>,
    pub clock: Arc<ManualClock>,
}

/// One participant's client plus handles on its local sinks
pub struct Client {
    pub state: Arc<AppState>,
    pub notifier: Arc<MemoryNotifier>,
    pub badge: Arc<MemoryBadge>,
}

impl Room {
    pub fn new() -> Self {
        Self::with_store(MemoryBlobStore::new())
    }

    pub fn with_store(store: MemoryBlobStore) -> Self {
        Self {
            store: Arc::new(store),
            roster: Arc::new(MemoryRoster::default()),
            hub: PubSubHub::new(),
            scene: Arc::new(MemoryScene::new()),
            clock: Arc::new(ManualClock::new(1_700_000_000_000)),
        }
    }

    pub fn join(&self, id: &str, name: &str) -> Client {
        let notifier = Arc::new(MemoryNotifier::default());
        let badge = Arc::new(MemoryBadge::default());
        let collaborators = Collaborators {
            store: self.store.clone(),
            roster: self.roster.clone(),
            pubsub: Arc::new(self.hub.connect(id)),
            notifier: notifier.clone(),
            badge: badge.clone(),
            scene: Some(self.scene.clone() as Arc<dyn SceneGraph>),
        };
        let state = Arc::new(AppState::new(
            Participant::new(id, name),
            ClientSettings::default(),
            collaborators,
            self.clock.clone(),
        ));
        Client { state, notifier, badge }
    }
}
