//! Scheduler-thread bootstrap for `Player`.
//!
//! This module prepares per-run shared state, captures it into a
//! [`ThreadContext`] and spawns the loop that drives the action executor.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::error::{PlayerError, Result};
use crate::playback::signals::RunSignals;
use crate::timeline::Timeline;

use super::super::{Player, PlayerState};
use super::worker::{run_playback_thread, ThreadContext};

impl Player {
    /// Spawn a fresh scheduler thread starting at `start_ms`.
    ///
    /// Each run gets its own [`RunSignals`] and generation id so a previous
    /// thread that is still winding down can never act on this run.
    pub(in crate::playback::player) fn initialize_thread(
        &self,
        timeline: Arc<Timeline>,
        start_ms: u64,
    ) -> Result<()> {
        self.join_playback_thread();

        let signals = Arc::new(RunSignals::new());
        *self.signals.lock().unwrap() = signals.clone();
        let playback_id = self.playback_id.fetch_add(1, Ordering::SeqCst) + 1;

        let context = ThreadContext {
            timeline,
            key_mapping: self.key_mapping.lock().unwrap().clone(),
            signals,
            play_state: self.state.clone(),
            position_ms: self.position_ms.clone(),
            pending_seek: self.pending_seek.clone(),
            settings: self.settings.clone(),
            settings_generation: self.settings_generation.clone(),
            executor: self.executor.clone(),
            events: self.events_tx.clone(),
            playback_id_atomic: self.playback_id.clone(),
        };

        *self.state.lock().unwrap() = PlayerState::Playing;
        let spawned = thread::Builder::new()
            .name("pianola-scheduler".to_string())
            .spawn(move || run_playback_thread(context, playback_id, start_ms));

        match spawned {
            Ok(handle) => {
                *self.playback_thread_handle.lock().unwrap() = Some(handle);
                Ok(())
            }
            Err(err) => {
                *self.state.lock().unwrap() = PlayerState::Stopped;
                Err(PlayerError::Spawn(err))
            }
        }
    }

    /// Join the previous scheduler thread if it has exited.
    ///
    /// A thread that is still running (a `stop` that timed out) is detached.
    pub(in crate::playback::player) fn join_playback_thread(&self) {
        let handle = self.playback_thread_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            if !handle.is_finished() {
                warn!("detaching playback thread that is still shutting down");
                return;
            }
            if handle.join().is_err() {
                warn!("playback thread panicked during join");
            }
        }
    }

    /// Return `true` when no scheduler thread is alive.
    pub(in crate::playback::player) fn thread_finished(&self) -> bool {
        self.playback_thread_handle
            .lock()
            .unwrap()
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Poll until the scheduler thread exits or `timeout` passes.
    pub(in crate::playback::player) fn wait_for_thread(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.thread_finished() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}
