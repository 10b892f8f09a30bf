//! Burn-out notifications: local toast, room broadcast and cleanup

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::state::detector::{Crossing, TransitionDetector};
use super::{
    notify::{NotificationSink, Severity},
    pubsub::{BroadcastScope, PubSub},
    reconcile::Reconciler,
    scene::SceneGraph,
};

/// Broadcast channel carrying burn-out alerts
pub const ALERT_CHANNEL: &str = "light-timers.plugin/alerts";

/// Payload other clients need to show the same alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    pub event_id: String,
    pub owner_name: String,
    pub owner_key: String,
    pub timer_name: String,
}

impl From<&Crossing> for AlertMessage {
    fn from(crossing: &Crossing) -> Self {
        Self {
            event_id: crossing.event_id.clone(),
            owner_name: crossing.owner_name.clone(),
            owner_key: crossing.owner_key.clone(),
            timer_name: crossing.timer_name.clone(),
        }
    }
}

impl AlertMessage {
    pub fn text(&self) -> String {
        format!("{}: {} has burned out", self.owner_name, self.timer_name)
    }
}

pub struct AlertFanout {
    notifier: Arc<dyn NotificationSink>,
    pubsub: Arc<dyn PubSub>,
    reconciler: Arc<Reconciler>,
    scene: Option<Arc<dyn SceneGraph>>,
}

impl AlertFanout {
    pub fn new(
        notifier: Arc<dyn NotificationSink>,
        pubsub: Arc<dyn PubSub>,
        reconciler: Arc<Reconciler>,
        scene: Option<Arc<dyn SceneGraph>>,
    ) -> Self {
        Self {
            notifier,
            pubsub,
            reconciler,
            scene,
        }
    }

    /// Show a locally detected burn-out and tell the rest of the room
    pub async fn dispatch(&self, crossing: &Crossing) {
        let message = AlertMessage::from(crossing);
        info!("Light burned out: {}", message.text());

        if let Err(e) = self.notifier.show(&message.text(), Severity::Warning).await {
            warn!("Failed to show burn-out notification: {}", e);
        }

        match serde_json::to_value(&message) {
            Ok(payload) => {
                if let Err(e) = self.pubsub.send(ALERT_CHANNEL, payload, BroadcastScope::Remote).await {
                    warn!("Failed to broadcast burn-out alert: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode burn-out alert: {}", e),
        }
    }

    /// Clear the linked scene marker and remove the timer
    pub async fn cascade(&self, crossing: &Crossing) {
        if let (Some(scene), Some(link_id)) = (&self.scene, &crossing.external_link_id) {
            if let Err(e) = scene.clear_light(link_id).await {
                warn!("Failed to clear light on scene item {}: {}", link_id, e);
            }
        }

        if let Err(e) = self.reconciler.delete(&crossing.timer_id).await {
            warn!("Failed to remove burned out timer {}: {}", crossing.timer_id, e);
        }
    }

    /// Handle an alert broadcast by another client; true if it was shown
    pub async fn receive(&self, detector: &Mutex<TransitionDetector>, payload: Value) -> bool {
        let message: AlertMessage = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(e) => {
                debug!("Ignoring malformed alert payload: {}", e);
                return false;
            }
        };

        let now = self.reconciler.now();
        let fresh = match detector.lock() {
            Ok(mut detector) => detector.mark_handled(&message.event_id, now),
            Err(e) => {
                warn!("Failed to lock transition detector: {}", e);
                return false;
            }
        };
        if !fresh {
            debug!("Alert {} already handled", message.event_id);
            return false;
        }

        if let Err(e) = self.notifier.show(&message.text(), Severity::Warning).await {
            warn!("Failed to show relayed notification: {}", e);
        }
        true
    }
}
