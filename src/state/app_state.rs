//! One client's view of the room: timers, detector and collaborators

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::TimerResult,
    services::{
        AlertFanout, BadgeSink, BlobStore, NotificationSink, OwnerGroup, Participant, PubSub,
        Reconciler, Roster, SceneGraph, SceneItem, Scope, group_by_owner,
    },
    utils::Clock,
};
use super::{
    detector::{Crossing, TransitionDetector},
    timer::{format_remaining, Timer, DEFAULT_DURATION_MS},
};

/// Metadata key holding the room timer list
pub const DEFAULT_STORE_KEY: &str = "light-timers.plugin/timers";

/// Host platform services this client talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn BlobStore>,
    pub roster: Arc<dyn Roster>,
    pub pubsub: Arc<dyn PubSub>,
    pub notifier: Arc<dyn NotificationSink>,
    pub badge: Arc<dyn BadgeSink>,
    pub scene: Option<Arc<dyn SceneGraph>>,
}

/// Tunables for one client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub store_key: String,
    pub default_duration_ms: i64,
    pub event_horizon_ms: i64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            store_key: DEFAULT_STORE_KEY.to_string(),
            default_duration_ms: DEFAULT_DURATION_MS,
            event_horizon_ms: 60 * 60 * 1000,
        }
    }
}

/// Badge content: text and color token
pub type Badge = (String, &'static str);

/// Badge for the soonest-expiring running timer, if any
pub fn badge_for(timers: &[Timer], now: i64) -> Option<Badge> {
    let remaining = timers
        .iter()
        .filter(|timer| timer.is_running(now))
        .map(|timer| timer.remaining(now))
        .min()?;

    let color = if remaining < 60_000 {
        "#d32f2f"
    } else if remaining < 5 * 60_000 {
        "#f57c00"
    } else {
        "#ffb300"
    };
    Some((format_remaining(remaining), color))
}

/// Main application state for the participant running this process
pub struct AppState {
    pub participant: Participant,
    pub settings: ClientSettings,
    pub reconciler: Arc<Reconciler>,
    pub alerts: AlertFanout,
    pub detector: Mutex<TransitionDetector>,
    pub collaborators: Collaborators,
    pub clock: Arc<dyn Clock>,
    panel_open: AtomicBool,
    last_badge: Mutex<Option<Option<Badge>>>,
    roster_cache: Mutex<Option<Vec<Participant>>>,
    /// Server metadata
    pub start_time: Instant,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    pub fn new(
        participant: Participant,
        settings: ClientSettings,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&collaborators.store),
            settings.store_key.clone(),
            Arc::clone(&clock),
        ));
        let alerts = AlertFanout::new(
            Arc::clone(&collaborators.notifier),
            Arc::clone(&collaborators.pubsub),
            Arc::clone(&reconciler),
            collaborators.scene.clone(),
        );

        Self {
            participant,
            detector: Mutex::new(TransitionDetector::new(settings.event_horizon_ms)),
            settings,
            reconciler,
            alerts,
            collaborators,
            clock,
            panel_open: AtomicBool::new(false),
            last_badge: Mutex::new(None),
            roster_cache: Mutex::new(None),
            start_time: Instant::now(),
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Room timers grouped per owner, names refreshed from the roster
    pub async fn grouped_timers(&self) -> TimerResult<Vec<OwnerGroup>> {
        let timers = self.reconciler.read_all().await?;
        let roster = self.roster().await;
        Ok(group_by_owner(&timers, &roster))
    }

    /// Latest roster pushed by the host, listed once on first use
    async fn roster(&self) -> Vec<Participant> {
        if let Ok(cache) = self.roster_cache.lock() {
            if let Some(participants) = cache.as_ref() {
                return participants.clone();
            }
        }

        match self.collaborators.roster.list().await {
            Ok(participants) => {
                self.apply_roster(participants.clone());
                participants
            }
            Err(e) => {
                warn!("Failed to read roster, keeping stored owner names: {}", e);
                Vec::new()
            }
        }
    }

    /// Replace the cached roster used for owner names
    pub fn apply_roster(&self, participants: Vec<Participant>) {
        debug!("Roster now has {} participants", participants.len());
        if let Ok(mut cache) = self.roster_cache.lock() {
            *cache = Some(participants);
        }
    }

    /// Set a new light for this participant
    pub async fn create_timer(&self, name: Option<String>, duration_ms: i64) -> TimerResult<Timer> {
        let timer = self.reconciler.create(&self.participant, name, duration_ms).await?;
        self.record_action("create");
        Ok(timer)
    }

    pub async fn start_timers(&self, scope: &Scope) -> TimerResult<Vec<Timer>> {
        let timers = self.reconciler.start(scope).await?;
        self.record_action("start");
        Ok(timers)
    }

    pub async fn pause_timers(&self, scope: &Scope) -> TimerResult<Vec<Timer>> {
        let timers = self.reconciler.pause(scope).await?;
        self.record_action("pause");
        Ok(timers)
    }

    pub async fn delete_timer(&self, id: &str) -> TimerResult<bool> {
        let removed = self.reconciler.delete(id).await?;
        self.record_action("delete");
        Ok(removed)
    }

    /// One polling pass: detect burn-outs, alert, refresh the badge
    ///
    /// Cleanup of burned out timers is left to the caller, see [`AppState::expire`].
    pub async fn tick(&self) -> TimerResult<Vec<Crossing>> {
        let timers = self.reconciler.read_all().await?;
        let now = self.now();

        let crossings = match self.detector.lock() {
            Ok(mut detector) => {
                let crossings = detector.observe(&timers, now);
                let pruned = detector.prune(now);
                if pruned > 0 {
                    debug!("Pruned {} handled burn-out events", pruned);
                }
                crossings
            }
            Err(e) => {
                warn!("Failed to lock transition detector: {}", e);
                Vec::new()
            }
        };

        for crossing in &crossings {
            self.alerts.dispatch(crossing).await;
        }

        self.refresh_badge(&timers, now).await;
        Ok(crossings)
    }

    /// Remove a burned out timer and clear its scene marker
    pub async fn expire(&self, crossing: &Crossing) {
        self.alerts.cascade(crossing).await;
    }

    /// Alert relayed by another client
    pub async fn handle_alert(&self, payload: Value) -> bool {
        self.alerts.receive(&self.detector, payload).await
    }

    /// Create timers for newly marked scene lights; returns how many were created
    pub async fn handle_scene(&self, items: &[SceneItem]) -> usize {
        let mut created = 0;
        for item in items {
            let Some(duration) = item.light_duration() else {
                continue;
            };
            let duration_ms = duration.unwrap_or(self.settings.default_duration_ms);
            match self
                .reconciler
                .ensure_linked(&self.participant, &item.id, item.name.clone(), duration_ms)
                .await
            {
                Ok(Some(_)) => created += 1,
                Ok(None) => {}
                Err(e) => warn!("Failed to create timer for scene item {}: {}", item.id, e),
            }
        }
        created
    }

    pub fn set_panel_open(&self, open: bool) {
        info!("Panel {}", if open { "opened" } else { "closed" });
        self.panel_open.store(open, Ordering::SeqCst);
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open.load(Ordering::SeqCst)
    }

    /// Push badge text/color when it changed since the last tick
    async fn refresh_badge(&self, timers: &[Timer], now: i64) {
        let badge = if self.is_panel_open() {
            None
        } else {
            badge_for(timers, now)
        };

        let changed = match self.last_badge.lock() {
            Ok(mut last) => {
                let changed = last.as_ref() != Some(&badge);
                *last = Some(badge.clone());
                changed
            }
            Err(_) => true,
        };
        if !changed {
            return;
        }

        let sink = &self.collaborators.badge;
        match badge {
            Some((text, color)) => {
                if let Err(e) = sink.set_text(Some(text)).await {
                    warn!("Failed to set badge text: {}", e);
                }
                if let Err(e) = sink.set_color(color).await {
                    warn!("Failed to set badge color: {}", e);
                }
            }
            None => {
                if let Err(e) = sink.set_text(None).await {
                    warn!("Failed to clear badge: {}", e);
                }
            }
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
