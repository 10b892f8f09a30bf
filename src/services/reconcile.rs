//! Read-modify-write of the room-wide timer list

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::{
    error::{TimerError, TimerResult},
    state::{
        normalize::{fill_owner_labels, normalize_list},
        timer::{Timer, MAX_DURATION_MS, MIN_DURATION_MS},
    },
    utils::Clock,
};
use super::{
    roster::Participant,
    store::{BlobStore, CasOutcome, Metadata},
};

/// Which timers a bulk start/pause touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Owner(String),
}

impl Scope {
    pub fn includes(&self, timer: &Timer) -> bool {
        match self {
            Scope::All => true,
            Scope::Owner(key) => timer.owner_key() == *key,
        }
    }
}

/// Start or resume every in-scope timer that is not already running
pub fn apply_start(timers: Vec<Timer>, scope: &Scope, now: i64) -> Vec<Timer> {
    timers
        .into_iter()
        .map(|mut timer| {
            if !scope.includes(&timer) || timer.is_running(now) {
                return timer;
            }
            if timer.remaining(now) == 0 {
                timer.offset_ms = 0;
            }
            timer.paused_at = None;
            timer.start_at = Some(now);
            timer
        })
        .collect()
}

/// Bank elapsed time and stop every live in-scope timer
pub fn apply_pause(timers: Vec<Timer>, scope: &Scope, now: i64) -> Vec<Timer> {
    timers
        .into_iter()
        .map(|mut timer| {
            if !scope.includes(&timer) || !timer.is_live() {
                return timer;
            }
            timer.offset_ms = timer.elapsed(now);
            timer.paused_at = Some(now);
            timer.start_at = None;
            timer
        })
        .collect()
}

/// Timers of one owner, as shown in one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerGroup {
    pub key: String,
    pub name: String,
    pub timers: Vec<Timer>,
}

/// Partition timers by owner, keeping first-appearance order
pub fn group_by_owner(timers: &[Timer], roster: &[Participant]) -> Vec<OwnerGroup> {
    let mut groups: Vec<OwnerGroup> = Vec::new();

    for timer in timers {
        let key = timer.owner_key();
        match groups.iter_mut().find(|group| group.key == key) {
            Some(group) => group.timers.push(timer.clone()),
            None => {
                let live_name = timer
                    .owner_id
                    .as_deref()
                    .and_then(|id| roster.iter().find(|p| p.id == id))
                    .map(|p| p.display_name.clone())
                    .filter(|name| !name.is_empty());
                groups.push(OwnerGroup {
                    key,
                    name: live_name.unwrap_or_else(|| timer.owner_label().to_string()),
                    timers: vec![timer.clone()],
                });
            }
        }
    }

    groups
}

/// Owns the room timer list stored under one metadata key
pub struct Reconciler {
    store: Arc<dyn BlobStore>,
    key: String,
    clock: Arc<dyn Clock>,
    write_gate: AsyncMutex<()>,
    max_attempts: usize,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            key: key.into(),
            clock,
            write_gate: AsyncMutex::new(()),
            max_attempts: 5,
        }
    }

    /// Limit how often a conflicting conditional write is retried
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Current timers in the room
    pub async fn read_all(&self) -> TimerResult<Vec<Timer>> {
        let metadata = self.store.get().await?;
        Ok(normalize_list(metadata.get(&self.key)))
    }

    /// Apply `updater` to the stored list and write the result back
    ///
    /// Only one write per client is in flight at a time. When the store has
    /// version tokens the whole cycle is retried on conflict, otherwise the
    /// last writer wins.
    pub async fn write_with<F>(&self, mut updater: F) -> TimerResult<Vec<Timer>>
    where
        F: FnMut(Vec<Timer>) -> Vec<Timer> + Send,
    {
        let _gate = self.write_gate.lock().await;

        for attempt in 1..=self.max_attempts {
            let (metadata, version) = self.store.get_versioned().await?;
            let current = normalize_list(metadata.get(&self.key));

            let updated = serde_json::to_value(updater(current))?;
            let mut next = normalize_list(Some(&updated));
            fill_owner_labels(&mut next);

            let mut patch = Metadata::new();
            patch.insert(self.key.clone(), serde_json::to_value(&next)?);

            let outcome = match version {
                Some(version) => self.store.compare_and_set(version, patch.clone()).await?,
                None => CasOutcome::Unsupported,
            };

            match outcome {
                CasOutcome::Applied => return Ok(next),
                CasOutcome::Unsupported => {
                    self.store.set(patch).await?;
                    return Ok(next);
                }
                CasOutcome::Conflict => {
                    debug!("Timer list changed during write, retrying (attempt {})", attempt);
                }
            }
        }

        warn!("Giving up timer write after {} conflicting attempts", self.max_attempts);
        Err(TimerError::Conflict {
            attempts: self.max_attempts,
        })
    }

    /// Start or resume timers in scope
    pub async fn start(&self, scope: &Scope) -> TimerResult<Vec<Timer>> {
        info!("Starting timers ({:?})", scope);
        let now = self.now();
        self.write_with(|timers| apply_start(timers, scope, now)).await
    }

    /// Pause timers in scope
    pub async fn pause(&self, scope: &Scope) -> TimerResult<Vec<Timer>> {
        info!("Pausing timers ({:?})", scope);
        let now = self.now();
        self.write_with(|timers| apply_pause(timers, scope, now)).await
    }

    /// Append a new burning timer owned by `actor`
    pub async fn create(&self, actor: &Participant, name: Option<String>, duration_ms: i64) -> TimerResult<Timer> {
        if duration_ms < MIN_DURATION_MS {
            return Err(TimerError::DurationTooShort { got: duration_ms });
        }
        if duration_ms > MAX_DURATION_MS {
            return Err(TimerError::DurationTooLong {
                got: duration_ms,
                max: MAX_DURATION_MS,
            });
        }

        let timer = Timer::new(name, duration_ms, self.now()).owned_by(&actor.id, &actor.display_name);
        info!("Creating timer {} ({} ms) for {}", timer.id, duration_ms, actor.display_name);

        let created = timer.clone();
        self.write_with(move |mut timers| {
            timers.push(timer.clone());
            timers
        })
        .await?;
        Ok(created)
    }

    /// Remove a timer by id; true if it existed
    pub async fn delete(&self, id: &str) -> TimerResult<bool> {
        let mut removed = false;
        self.write_with(|mut timers| {
            let before = timers.len();
            timers.retain(|timer| timer.id != id);
            removed = timers.len() != before;
            timers
        })
        .await?;

        if removed {
            info!("Deleted timer {}", id);
        } else {
            debug!("Timer {} was already gone", id);
        }
        Ok(removed)
    }

    /// Create a timer for a scene item unless one is already linked to it
    pub async fn ensure_linked(
        &self,
        actor: &Participant,
        link_id: &str,
        name: Option<String>,
        duration_ms: i64,
    ) -> TimerResult<Option<Timer>> {
        let duration_ms = duration_ms.clamp(MIN_DURATION_MS, MAX_DURATION_MS);
        let candidate = Timer::new(name, duration_ms, self.now())
            .owned_by(&actor.id, &actor.display_name)
            .linked_to(link_id);

        let mut created = None;
        self.write_with(|mut timers| {
            created = None;
            let linked = timers
                .iter()
                .any(|timer| timer.external_link_id.as_deref() == Some(link_id));
            if !linked {
                timers.push(candidate.clone());
                created = Some(candidate.clone());
            }
            timers
        })
        .await?;

        if let Some(timer) = &created {
            info!("Created timer {} for scene item {}", timer.id, link_id);
        }
        Ok(created)
    }
}
