//! Fixtures shared by the unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::actuator::KeyActuator;
use crate::error::ActuatorError;
use crate::timeline::{Event, Timeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Press,
    Release,
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub(crate) at: Duration,
    pub(crate) action: Action,
    pub(crate) key: String,
}

/// Actuator that records every successful call with its offset from creation.
pub(crate) struct RecordingActuator {
    started: Instant,
    log: Mutex<Vec<Recorded>>,
    failing_press: HashSet<String>,
}

impl RecordingActuator {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            log: Mutex::new(Vec::new()),
            failing_press: HashSet::new(),
        }
    }

    /// Presses of the given keys fail with an [`ActuatorError::Press`].
    pub(crate) fn failing_press(keys: &[&str]) -> Self {
        Self {
            failing_press: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::new()
        }
    }

    pub(crate) fn entries(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn actions_for(&self, key: &str) -> Vec<Action> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.key == key)
            .map(|entry| entry.action)
            .collect()
    }

    pub(crate) fn presses_of(&self, key: &str) -> Vec<Duration> {
        self.times_of(key, Action::Press)
    }

    pub(crate) fn releases_of(&self, key: &str) -> Vec<Duration> {
        self.times_of(key, Action::Release)
    }

    fn times_of(&self, key: &str, action: Action) -> Vec<Duration> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.key == key && entry.action == action)
            .map(|entry| entry.at)
            .collect()
    }

    fn record(&self, key: &str, action: Action) {
        self.log.lock().unwrap().push(Recorded {
            at: self.started.elapsed(),
            action,
            key: key.to_string(),
        });
    }
}

impl KeyActuator for RecordingActuator {
    fn press(&self, key: &str) -> Result<(), ActuatorError> {
        if self.failing_press.contains(key) {
            return Err(ActuatorError::Press {
                key: key.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        self.record(key, Action::Press);
        Ok(())
    }

    fn release(&self, key: &str) -> Result<(), ActuatorError> {
        self.record(key, Action::Release);
        Ok(())
    }
}

/// Build a timeline from `(timestamp_ms, action_id)` pairs.
pub(crate) fn timeline(events: &[(u64, &str)]) -> Timeline {
    Timeline::from_events(events.iter().map(|(t, id)| Event::new(*t, *id)))
}
