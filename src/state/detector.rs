//! Edge detection of timers burning out between polling ticks

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::timer::Timer;

/// A timer that reached zero while live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crossing {
    pub event_id: String,
    pub owner_key: String,
    pub owner_name: String,
    pub timer_id: String,
    pub timer_name: String,
    pub external_link_id: Option<String>,
}

/// Identifier shared by every client observing the same burn-out
pub fn event_id(timer: &Timer) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        timer.owner_key(),
        timer.id,
        timer.duration_ms,
        timer.start_at.map(|ms| ms.to_string()).unwrap_or_default(),
        timer.offset_ms,
    )
}

fn timer_key(timer: &Timer) -> String {
    format!("{}|{}", timer.owner_key(), timer.id)
}

/// Tracks the previous remaining time per timer and the events already handled
#[derive(Debug)]
pub struct TransitionDetector {
    previous: HashMap<String, i64>,
    handled: HashMap<String, i64>,
    horizon_ms: i64,
}

impl TransitionDetector {
    /// Create a detector that forgets handled events after `horizon_ms`
    pub fn new(horizon_ms: i64) -> Self {
        Self {
            previous: HashMap::new(),
            handled: HashMap::new(),
            horizon_ms,
        }
    }

    /// Compare this tick's remaining times against the previous tick
    pub fn observe(&mut self, timers: &[Timer], now: i64) -> Vec<Crossing> {
        let mut crossings = Vec::new();
        let mut seen = HashSet::with_capacity(timers.len());

        for timer in timers {
            let key = timer_key(timer);
            let current = timer.remaining(now);
            let previous = self.previous.get(&key).copied().unwrap_or(current);

            if previous > 0 && current <= 0 && timer.is_live() {
                let id = event_id(timer);
                if self.mark_handled(&id, now) {
                    debug!("Timer {} crossed zero (event {})", timer.id, id);
                    crossings.push(Crossing {
                        event_id: id,
                        owner_key: timer.owner_key(),
                        owner_name: timer.owner_label().to_string(),
                        timer_id: timer.id.clone(),
                        timer_name: timer.display_name().to_string(),
                        external_link_id: timer.external_link_id.clone(),
                    });
                } else {
                    debug!("Skipping already handled event {}", id);
                }
            }

            self.previous.insert(key.clone(), current);
            seen.insert(key);
        }

        self.previous.retain(|key, _| seen.contains(key));
        crossings
    }

    /// Record an event as handled; false when it already was
    pub fn mark_handled(&mut self, event_id: &str, now: i64) -> bool {
        if self.handled.contains_key(event_id) {
            return false;
        }
        self.handled.insert(event_id.to_string(), now);
        true
    }

    pub fn is_handled(&self, event_id: &str) -> bool {
        self.handled.contains_key(event_id)
    }

    /// Forget handled events older than the horizon
    pub fn prune(&mut self, now: i64) -> usize {
        let before = self.handled.len();
        let horizon = self.horizon_ms;
        self.handled.retain(|_, handled_at| now.saturating_sub(*handled_at) <= horizon);
        before - self.handled.len()
    }

    pub fn handled_count(&self) -> usize {
        self.handled.len()
    }

    pub fn tracked_count(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 60 * 60 * 1000;

    fn running(id: &str, duration_ms: i64, start_at: i64) -> Timer {
        let mut timer = Timer::new(Some("Torch".into()), duration_ms, start_at).owned_by("p1", "Aria");
        timer.id = id.to_string();
        timer
    }

    #[test]
    fn fires_once_per_crossing() {
        let mut detector = TransitionDetector::new(HOUR);
        let timers = vec![running("a", 1_000, 0)];

        assert!(detector.observe(&timers, 500).is_empty());
        let crossings = detector.observe(&timers, 1_100);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].timer_id, "a");
        assert_eq!(crossings[0].owner_name, "Aria");

        for tick in 0..20 {
            assert!(detector.observe(&timers, 1_600 + tick * 500).is_empty());
        }
    }

    #[test]
    fn first_sight_of_expired_timer_does_not_fire() {
        let mut detector = TransitionDetector::new(HOUR);
        let timers = vec![running("a", 1_000, 0)];
        assert!(detector.observe(&timers, 5_000).is_empty());
        assert!(detector.observe(&timers, 5_500).is_empty());
    }

    #[test]
    fn paused_timer_does_not_fire() {
        let mut detector = TransitionDetector::new(HOUR);
        let mut timer = running("a", 1_000, 0);
        detector.observe(std::slice::from_ref(&timer), 500);

        timer.start_at = None;
        timer.paused_at = Some(600);
        timer.offset_ms = 1_000;
        assert!(detector.observe(std::slice::from_ref(&timer), 700).is_empty());
    }

    #[test]
    fn event_id_is_deterministic() {
        let a = running("a", 1_000, 42);
        let b = a.clone();
        assert_eq!(event_id(&a), event_id(&b));
        assert_eq!(event_id(&a), "p1|a|1000|42|0");
    }

    #[test]
    fn handled_event_is_not_reported() {
        let mut detector = TransitionDetector::new(HOUR);
        let timers = vec![running("a", 1_000, 0)];
        assert!(detector.mark_handled(&event_id(&timers[0]), 0));

        detector.observe(&timers, 500);
        assert!(detector.observe(&timers, 1_500).is_empty());
    }

    #[test]
    fn restarted_timer_can_fire_again() {
        let mut detector = TransitionDetector::new(HOUR);
        let mut timer = running("a", 1_000, 0);
        detector.observe(std::slice::from_ref(&timer), 500);
        assert_eq!(detector.observe(std::slice::from_ref(&timer), 1_200).len(), 1);

        timer.start_at = Some(2_000);
        detector.observe(std::slice::from_ref(&timer), 2_100);
        assert_eq!(detector.observe(std::slice::from_ref(&timer), 3_100).len(), 1);
    }

    #[test]
    fn forgets_removed_timers_and_prunes_old_events() {
        let mut detector = TransitionDetector::new(1_000);
        let timers = vec![running("a", 1_000, 0), running("b", 5_000, 0)];
        detector.observe(&timers, 500);
        detector.observe(&timers, 1_500);
        assert_eq!(detector.tracked_count(), 2);
        assert_eq!(detector.handled_count(), 1);

        detector.observe(&timers[1..], 2_000);
        assert_eq!(detector.tracked_count(), 1);

        assert_eq!(detector.prune(2_000), 0);
        assert_eq!(detector.prune(3_000), 1);
        assert_eq!(detector.handled_count(), 0);
    }

    #[test]
    fn unbounded_horizon_keeps_events() {
        let mut detector = TransitionDetector::new(i64::MAX);
        assert!(detector.mark_handled("e", i64::MIN));
        assert_eq!(detector.prune(i64::MAX), 0);
        assert_eq!(detector.handled_count(), 1);
    }
}
