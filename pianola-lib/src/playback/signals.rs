//! Pause and stop signalling between the transport and one scheduler run.
//!
//! Both flags live behind the same mutex and condition variable, so a paused
//! or sleeping scheduler wakes immediately on either command.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug, Default)]
struct SignalState {
    paused: bool,
    stopped: bool,
}

/// Result of [`RunSignals::wait_while_paused`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PauseWait {
    /// Not paused; returned without blocking.
    Running,
    /// Was paused and has been resumed.
    Resumed,
    Stopped,
}

/// Result of [`RunSignals::sleep_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Elapsed,
    Paused,
    Stopped,
}

/// Signals owned by a single scheduler run. A new run gets a fresh instance.
#[derive(Debug, Default)]
pub(crate) struct RunSignals {
    state: Mutex<SignalState>,
    changed: Condvar,
}

impl RunSignals {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` when already paused or stopped.
    pub(crate) fn pause(&self) -> bool {
        let mut state = self.lock();
        if state.paused || state.stopped {
            return false;
        }
        state.paused = true;
        self.changed.notify_all();
        true
    }

    /// Returns `false` when not paused.
    pub(crate) fn resume(&self) -> bool {
        let mut state = self.lock();
        if !state.paused {
            return false;
        }
        state.paused = false;
        self.changed.notify_all();
        true
    }

    /// Request cancellation. Also lifts a pause so the waiter can observe it.
    pub(crate) fn stop(&self) {
        let mut state = self.lock();
        state.stopped = true;
        state.paused = false;
        self.changed.notify_all();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    #[cfg(test)]
    pub(crate) fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Block for as long as the run is paused.
    pub(crate) fn wait_while_paused(&self) -> PauseWait {
        let state = self.lock();
        if state.stopped {
            return PauseWait::Stopped;
        }
        if !state.paused {
            return PauseWait::Running;
        }
        let state = self
            .changed
            .wait_while(state, |s| s.paused && !s.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        if state.stopped {
            PauseWait::Stopped
        } else {
            PauseWait::Resumed
        }
    }

    /// Sleep until `deadline`, returning early on pause or stop.
    pub(crate) fn sleep_until(&self, deadline: Instant) -> Wake {
        let mut state = self.lock();
        loop {
            if state.stopped {
                return Wake::Stopped;
            }
            if state.paused {
                return Wake::Paused;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wake::Elapsed;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
