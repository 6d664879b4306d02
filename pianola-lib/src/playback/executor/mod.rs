//! Press → hold → release execution for fired actions.
//!
//! - [`key_state`] tracks which keys are currently held.
//! - [`guard`] finishes a firing on every exit path.
//!
//! Each firing runs on its own short-lived thread. Access to the actuator and
//! the held-state map is serialized by one lock, so different keys overlap
//! freely while operations on the same key are strictly ordered.

mod guard;
mod key_state;

pub use key_state::KeyState;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, warn};

use crate::actuator::KeyActuator;
use crate::error::ActuatorError;
use crate::playback::events::{EventSink, PlayerEvent};

use guard::{InFlightGuard, ReleaseGuard};

/// Fires key actions against a shared actuator.
#[derive(Clone)]
pub struct ActionExecutor {
    actuator: Arc<dyn KeyActuator>,
    key_state: Arc<Mutex<KeyState>>,
    events: EventSink,
    in_flight: Arc<AtomicUsize>,
    settle: Duration,
}

impl ActionExecutor {
    /// Create an executor that reports actuator failures on `events`.
    ///
    /// `settle` is the gap between releasing a still-held key and pressing it
    /// again.
    pub fn new(
        actuator: Arc<dyn KeyActuator>,
        events: EventSink,
        settle: Duration,
    ) -> Self {
        Self {
            actuator,
            key_state: Arc::new(Mutex::new(KeyState::default())),
            events,
            in_flight: Arc::new(AtomicUsize::new(0)),
            settle,
        }
    }

    /// Press `key`, hold it for `hold`, then release it. Returns immediately.
    pub fn fire(&self, key: &str, hold: Duration) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let executor = self.clone();
        let owned_key = key.to_string();
        let spawned = thread::Builder::new()
            .name(format!("pianola-fire-{}", key))
            .spawn(move || {
                let _in_flight = InFlightGuard::adopt(executor.in_flight.clone());
                executor.press_and_release(&owned_key, hold);
            });
        if let Err(err) = spawned {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            error!("failed to spawn firing thread for {}: {}", key, err);
        }
    }

    fn press_and_release(&self, key: &str, hold: Duration) {
        let _release = ReleaseGuard::new(self, key);

        let pressed = {
            let mut state = self.lock_state();
            if state.is_held(key) {
                self.report(self.actuator.release(key));
                state.set_held(key, false);
                thread::sleep(self.settle);
            }
            match self.actuator.press(key) {
                Ok(()) => {
                    state.set_held(key, true);
                    true
                }
                Err(err) => {
                    self.report_failure(err);
                    false
                }
            }
        };

        if pressed {
            thread::sleep(hold);
        }
    }

    /// Unconditional end of a firing: release and mark not held.
    fn finish(&self, key: &str) {
        let mut state = self.lock_state();
        self.report(self.actuator.release(key));
        state.set_held(key, false);
    }

    /// Release every key still marked as held. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let mut state = self.lock_state();
        let held = state.held_keys();
        for key in &held {
            self.report(self.actuator.release(key));
            state.set_held(key, false);
        }
        held.len()
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.lock_state().is_held(key)
    }

    pub fn held_keys(&self) -> Vec<String> {
        self.lock_state().held_keys()
    }

    /// Number of firings that have not finished their cleanup yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no firing is outstanding. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.in_flight() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, KeyState> {
        // A panicking actuator must not leave keys stuck for later firings.
        self.key_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, result: Result<(), ActuatorError>) {
        if let Err(err) = result {
            self.report_failure(err);
        }
    }

    fn report_failure(&self, err: ActuatorError) {
        warn!("{}", err);
        self.events.emit(PlayerEvent::ActuatorFailed(err));
    }
}
