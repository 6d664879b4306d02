//! Transport and lifecycle operations for `Player`.
//!
//! Methods here coordinate playback-state transitions with the scheduler
//! thread and expose user-facing control primitives (play/pause/seek/stop),
//! song loading and progress inspection.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use log::{debug, info, warn};

use crate::error::{PlayerError, Result};
use crate::playback::events::PlayerEvent;
use crate::playback::signals::RunSignals;
use crate::song;
use crate::timeline::{BuildReport, NoteRecord, Timeline};

use super::{Player, PlayerState, Progress};

impl Player {
    /// Replace the loaded song. Any running playback is stopped first.
    pub fn load_timeline(&self, timeline: Timeline) {
        self.stop();
        let _transport = self.transport.lock().unwrap();
        self.install_timeline(timeline);
    }

    /// Index raw records and load the result.
    ///
    /// # Returns
    ///
    /// How many records were kept and how many were dropped.
    pub fn load_records(&self, records: &[NoteRecord]) -> BuildReport {
        let (timeline, report) = Timeline::build_with_report(records);
        self.load_timeline(timeline);
        report
    }

    /// Read, index and load a song file right away.
    pub fn load_song_file(&self, path: impl AsRef<Path>) -> Result<BuildReport> {
        let records = song::load_song_file(path)?;
        Ok(self.load_records(&records))
    }

    /// Remember a song file to be loaded by the next `play`.
    ///
    /// Clears any loaded timeline so the file is read fresh.
    pub fn set_source(&self, path: impl Into<PathBuf>) {
        self.stop();
        let _transport = self.transport.lock().unwrap();
        *self.source.lock().unwrap() = Some(path.into());
        *self.timeline.lock().unwrap() = None;
        self.total_ms.store(0, Ordering::SeqCst);
        self.position_ms.store(0, Ordering::SeqCst);
    }

    /// The loaded timeline, if any.
    pub fn timeline(&self) -> Option<Arc<Timeline>> {
        self.timeline.lock().unwrap().clone()
    }

    /// Start playback from the current position.
    ///
    /// Resumes when paused and does nothing when already playing. A position
    /// at or past the last event starts over from 0. An empty timeline is
    /// treated as nothing to play.
    pub fn play(&self) -> Result<()> {
        let _transport = self.transport.lock().unwrap();
        match self.get_state() {
            PlayerState::Playing => return Ok(()),
            PlayerState::Paused => {
                self.resume_locked();
                return Ok(());
            }
            _ => {}
        }

        let settings = self.settings.lock().unwrap().clone();
        settings.validate()?;
        let timeline = self.ensure_timeline()?;
        if timeline.is_empty() {
            info!("Nothing to play: the song has no valid notes");
            return Ok(());
        }

        let mut start_ms = self.position_ms.load(Ordering::SeqCst);
        if self.get_state() == PlayerState::Finished || start_ms >= timeline.max_timestamp_ms() {
            start_ms = 0;
        }
        self.pending_seek.lock().unwrap().take();
        self.position_ms.store(start_ms, Ordering::SeqCst);

        info!(
            "Playing from {} ms (speed {}x, hold {}s)",
            start_ms, settings.speed, settings.hold_duration_s
        );
        self.initialize_thread(timeline, start_ms)
    }

    /// Pause playback. No-op unless currently playing.
    pub fn pause(&self) {
        let _transport = self.transport.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        if *state != PlayerState::Playing {
            return;
        }
        if self.current_signals().pause() {
            *state = PlayerState::Paused;
            info!("Paused at {} ms", self.position_ms.load(Ordering::SeqCst));
        }
    }

    /// Resume playback. No-op unless currently paused.
    pub fn resume(&self) {
        let _transport = self.transport.lock().unwrap();
        self.resume_locked();
    }

    fn resume_locked(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != PlayerState::Paused {
            return;
        }
        self.current_signals().resume();
        *state = PlayerState::Playing;
        info!("Resuming at {} ms", self.position_ms.load(Ordering::SeqCst));
    }

    /// Seek to `target_ms`, clamped to the song length.
    ///
    /// While a run is active the scheduler picks the target up at its next
    /// iteration; the visible position changes immediately in every state.
    ///
    /// # Returns
    ///
    /// The clamped target.
    pub fn seek(&self, target_ms: u64) -> u64 {
        let _transport = self.transport.lock().unwrap();
        let target = target_ms.min(self.total_ms.load(Ordering::SeqCst));
        self.position_ms.store(target, Ordering::SeqCst);

        let mut pending = self.pending_seek.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        if state.is_active() {
            *pending = Some(target);
        } else {
            *pending = None;
            if *state == PlayerState::Finished {
                *state = PlayerState::Stopped;
            }
        }
        debug!("seek to {} ms", target);
        target
    }

    /// Stop playback and wait (bounded) for the scheduler thread to exit.
    ///
    /// All keys are force-released afterwards, whether or not the thread
    /// exited in time.
    pub fn stop(&self) {
        let _transport = self.transport.lock().unwrap();
        self.current_signals().stop();

        let timeout = self.settings.lock().unwrap().stop_timeout();
        if self.wait_for_thread(timeout) {
            self.join_playback_thread();
        } else {
            warn!(
                "playback thread did not stop within {} ms; releasing keys anyway",
                timeout.as_millis()
            );
        }

        let released = self.executor.release_all();
        if released > 0 {
            debug!("released {} held key(s) on stop", released);
        }
        if let Some(target) = self.pending_seek.lock().unwrap().take() {
            self.position_ms.store(target, Ordering::SeqCst);
        }

        let mut state = self.state.lock().unwrap();
        if state.is_active() {
            *state = PlayerState::Stopped;
            info!("Stopped at {} ms", self.position_ms.load(Ordering::SeqCst));
        }
    }

    /// Current position, song length and state. Never blocks the scheduler.
    pub fn get_progress(&self) -> Progress {
        let total_ms = self.total_ms.load(Ordering::SeqCst);
        Progress {
            current_ms: self.position_ms.load(Ordering::SeqCst).min(total_ms),
            total_ms,
            state: self.get_state(),
        }
    }

    pub fn get_state(&self) -> PlayerState {
        *self.state.lock().unwrap()
    }

    /// Current position in milliseconds.
    pub fn get_time_ms(&self) -> u64 {
        self.get_progress().current_ms
    }

    /// Song length in milliseconds (the last event's timestamp).
    pub fn get_duration_ms(&self) -> u64 {
        self.total_ms.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.get_state() == PlayerState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.get_state() == PlayerState::Paused
    }

    /// Return true when no scheduler thread is alive.
    pub fn is_finished(&self) -> bool {
        self.thread_finished()
    }

    /// Receiver for playback notifications (outcomes and actuator failures).
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.events_rx.clone()
    }

    /// Block until the scheduler thread exits. Returns `false` on timeout.
    pub fn wait_until_done(&self, timeout: Duration) -> bool {
        self.wait_for_thread(timeout)
    }

    /// Block the current thread until playback finishes.
    pub fn sleep_until_end(&self) {
        while !self.thread_finished() {
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Keys the executor currently holds down.
    pub fn held_keys(&self) -> Vec<String> {
        self.executor.held_keys()
    }

    /// Wait until every fired key has gone through its release.
    pub fn wait_for_releases(&self, timeout: Duration) -> bool {
        self.executor.wait_idle(timeout)
    }

    fn current_signals(&self) -> Arc<RunSignals> {
        self.signals.lock().unwrap().clone()
    }

    fn ensure_timeline(&self) -> Result<Arc<Timeline>> {
        if let Some(timeline) = self.timeline() {
            return Ok(timeline);
        }
        let source = self
            .source
            .lock()
            .unwrap()
            .clone()
            .ok_or(PlayerError::NothingLoaded)?;
        let started = Instant::now();
        let records = song::load_song_file(&source)?;
        let (timeline, report) = Timeline::build_with_report(&records);
        info!(
            "Loaded {} in {} ms: {} note(s), {} dropped",
            source.display(),
            started.elapsed().as_millis(),
            report.accepted,
            report.dropped
        );
        Ok(self.install_timeline(timeline))
    }

    fn install_timeline(&self, timeline: Timeline) -> Arc<Timeline> {
        let timeline = Arc::new(timeline);
        self.total_ms
            .store(timeline.max_timestamp_ms(), Ordering::SeqCst);
        self.position_ms.store(0, Ordering::SeqCst);
        self.pending_seek.lock().unwrap().take();
        *self.timeline.lock().unwrap() = Some(timeline.clone());
        *self.state.lock().unwrap() = PlayerState::Idle;
        timeline
    }
}
