//! External collaborator and reconciliation module
//! 
//! This module contains the interfaces to the host platform (metadata store,
//! roster, broadcast channel, notifications, scene) together with in-memory
//! implementations, plus the logic that reconciles the shared timer list and
//! fans out burn-out alerts.

pub mod alerts;
pub mod notify;
pub mod pubsub;
pub mod reconcile;
pub mod roster;
pub mod scene;
pub mod store;

// Re-export main types
pub use alerts::{AlertFanout, AlertMessage, ALERT_CHANNEL};
pub use notify::{BadgeSink, LogBadge, LogNotifier, MemoryBadge, MemoryNotifier, NotificationSink, Severity};
pub use pubsub::{BroadcastScope, MemoryPubSub, PubSub, PubSubHub};
pub use reconcile::{group_by_owner, OwnerGroup, Reconciler, Scope};
pub use roster::{MemoryRoster, Participant, Roster};
pub use scene::{MemoryScene, SceneGraph, SceneItem, LIGHT_MARKER_KEY};
pub use store::{BlobStore, CasOutcome, MemoryBlobStore, Metadata};
