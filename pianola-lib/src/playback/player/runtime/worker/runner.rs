//! Scheduler loop implementation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::PlaybackSettings;
use crate::playback::events::PlayerEvent;
use crate::playback::signals::{PauseWait, Wake};
use crate::tools::clock::{virtual_to_wall, SyncClock};

use super::super::super::PlayerState;
use super::context::ThreadContext;
use super::guard::RunCleanupGuard;

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Finished,
    Stopped,
    RuntimeExceeded { expected_ms: u64, elapsed_ms: u64 },
    Panicked,
}

/// Settings the loop works with between two re-reads.
struct RunParams {
    settings: PlaybackSettings,
    generation: u64,
}

/// Per-run mutable state for virtual time and wall-clock sync.
struct LoopState {
    virtual_ms: u64,
    clock: SyncClock,
    params: RunParams,
}

impl LoopState {
    fn new(ctx: &ThreadContext, start_ms: u64) -> Self {
        let (settings, generation) = ctx.read_settings();
        Self {
            virtual_ms: start_ms,
            clock: SyncClock::new(start_ms, settings.speed),
            params: RunParams {
                settings,
                generation,
            },
        }
    }

    /// Re-read speed and hold, then re-anchor the clock at the current
    /// virtual time.
    fn refresh(&mut self, ctx: &ThreadContext) {
        let (settings, generation) = ctx.read_settings();
        self.clock.rebase(self.virtual_ms, settings.speed);
        self.params = RunParams {
            settings,
            generation,
        };
    }

    fn end_ms(&self, max_ms: u64) -> u64 {
        max_ms.saturating_add(self.params.settings.hold_ms())
    }
}

/// Run the scheduler loop for a single generation (`playback_id`).
///
/// # Arguments
///
/// * `ctx` - Captured shared state and handles for this run.
/// * `playback_id` - Generation ID used to ignore stale runs.
/// * `start_ms` - Virtual time to start from.
pub(in crate::playback::player::runtime) fn run_playback_thread(
    ctx: ThreadContext,
    playback_id: u64,
    start_ms: u64,
) {
    let outcome = run_guarded(|| {
        let _cleanup = RunCleanupGuard::new(ctx.executor.clone());
        let mut state = LoopState::new(&ctx, start_ms);
        let outcome = run_loop(&ctx, &mut state);
        if outcome == RunOutcome::Finished {
            ctx.executor.wait_idle(state.params.settings.hold_duration());
        }
        outcome
    });
    finish_run(&ctx, playback_id, outcome);
}

/// Run `body`, turning a panic into [`RunOutcome::Panicked`] so the run
/// still publishes a terminal state.
fn run_guarded(body: impl FnOnce() -> RunOutcome) -> RunOutcome {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(RunOutcome::Panicked)
}

fn run_loop(ctx: &ThreadContext, state: &mut LoopState) -> RunOutcome {
    let max_ms = ctx.timeline.max_timestamp_ms();

    loop {
        if ctx.signals.is_stopped() {
            return RunOutcome::Stopped;
        }

        match ctx.signals.wait_while_paused() {
            PauseWait::Stopped => return RunOutcome::Stopped,
            PauseWait::Resumed => state.refresh(ctx),
            PauseWait::Running => {}
        }

        if let Some(target) = ctx.pending_seek.lock().unwrap().take() {
            debug!("scheduler jumping to {} ms", target);
            state.virtual_ms = target;
            state.refresh(ctx);
        } else if ctx.settings_generation.load(Ordering::SeqCst) != state.params.generation {
            state.refresh(ctx);
        }

        if state.virtual_ms > state.end_ms(max_ms) {
            return RunOutcome::Finished;
        }

        fire_due(ctx, state);

        ctx.position_ms.store(state.virtual_ms, Ordering::SeqCst);
        state.virtual_ms += 1;

        match ctx.signals.sleep_until(state.clock.deadline(state.virtual_ms)) {
            Wake::Stopped => return RunOutcome::Stopped,
            Wake::Paused | Wake::Elapsed => {}
        }

        if let Some((expected_ms, elapsed_ms)) = check_runaway(
            max_ms,
            state.params.settings.hold_ms(),
            state.clock.speed(),
            state.clock.elapsed(),
            state.params.settings.runaway_margin(),
        ) {
            return RunOutcome::RuntimeExceeded {
                expected_ms,
                elapsed_ms,
            };
        }
    }
}

fn fire_due(ctx: &ThreadContext, state: &LoopState) {
    let hold = state.params.settings.hold_duration();
    for action_id in ctx.timeline.actions_at(state.virtual_ms) {
        match ctx.resolve_key(action_id) {
            Some(key) => ctx.executor.fire(key, hold),
            None => debug!("no key mapped for action {}", action_id),
        }
    }
}

/// Compare the wall time spent against the expected run time.
///
/// # Returns
///
/// `(expected_ms, elapsed_ms)` when `elapsed` overran the expected time by
/// more than `margin`. A zero-length song or a `None` margin never trips.
fn check_runaway(
    max_ms: u64,
    hold_ms: u64,
    speed: f64,
    elapsed: Duration,
    margin: Option<Duration>,
) -> Option<(u64, u64)> {
    let margin = margin?;
    if max_ms == 0 {
        return None;
    }
    let expected = virtual_to_wall(max_ms.saturating_add(hold_ms), speed);
    if elapsed > expected.saturating_add(margin) {
        Some((expected.as_millis() as u64, elapsed.as_millis() as u64))
    } else {
        None
    }
}

/// Publish the final state and event for a run.
fn finish_run(ctx: &ThreadContext, playback_id: u64, outcome: RunOutcome) {
    let current = ctx.is_current(playback_id);
    let event = match outcome {
        RunOutcome::Finished => {
            if current {
                ctx.position_ms
                    .store(ctx.timeline.max_timestamp_ms(), Ordering::SeqCst);
                *ctx.play_state.lock().unwrap() = PlayerState::Finished;
            }
            info!("Playback finished");
            PlayerEvent::Finished
        }
        RunOutcome::Stopped => {
            debug!("scheduler run {} stopped", playback_id);
            PlayerEvent::Stopped
        }
        RunOutcome::RuntimeExceeded {
            expected_ms,
            elapsed_ms,
        } => {
            warn!(
                "Playback aborted: ran {} ms against an expected {} ms",
                elapsed_ms, expected_ms
            );
            if current {
                *ctx.play_state.lock().unwrap() = PlayerState::Aborted;
            }
            PlayerEvent::RuntimeExceeded {
                expected_ms,
                elapsed_ms,
            }
        }
        RunOutcome::Panicked => {
            error!("Scheduler run {} panicked; playback aborted", playback_id);
            if current {
                *ctx.play_state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = PlayerState::Aborted;
            }
            PlayerEvent::SchedulerPanicked
        }
    };
    ctx.events.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::events::EventSink;
    use crate::playback::executor::ActionExecutor;
    use crate::playback::signals::RunSignals;
    use crate::test_support::{timeline, RecordingActuator};
    use crossbeam_channel::Receiver;
    use std::sync::atomic::AtomicU64;
    use std::sync::{Arc, Mutex};

    const MARGIN: Option<Duration> = Some(Duration::from_secs(10));

    fn context(state: PlayerState, current_id: u64) -> (ThreadContext, Receiver<PlayerEvent>) {
        let (events, rx) = EventSink::new(8);
        let actuator = Arc::new(RecordingActuator::new());
        let ctx = ThreadContext {
            timeline: Arc::new(timeline(&[(0, "a"), (40, "b")])),
            key_mapping: None,
            signals: Arc::new(RunSignals::new()),
            play_state: Arc::new(Mutex::new(state)),
            position_ms: Arc::new(AtomicU64::new(0)),
            pending_seek: Arc::new(Mutex::new(None)),
            settings: Arc::new(Mutex::new(PlaybackSettings::default())),
            settings_generation: Arc::new(AtomicU64::new(0)),
            executor: ActionExecutor::new(actuator, events.clone(), Duration::from_millis(5)),
            events,
            playback_id_atomic: Arc::new(AtomicU64::new(current_id)),
        };
        (ctx, rx)
    }

    #[test]
    fn panicking_run_body_becomes_an_outcome() {
        assert_eq!(run_guarded(|| RunOutcome::Stopped), RunOutcome::Stopped);
        assert_eq!(
            run_guarded(|| panic!("scheduler failure")),
            RunOutcome::Panicked
        );
    }

    #[test]
    fn panicked_run_publishes_aborted_state() {
        let (ctx, events) = context(PlayerState::Playing, 3);
        finish_run(&ctx, 3, RunOutcome::Panicked);

        assert_eq!(*ctx.play_state.lock().unwrap(), PlayerState::Aborted);
        assert_eq!(events.try_recv().ok(), Some(PlayerEvent::SchedulerPanicked));
    }

    #[test]
    fn stale_run_does_not_overwrite_state() {
        let (ctx, events) = context(PlayerState::Playing, 4);
        finish_run(&ctx, 3, RunOutcome::Finished);

        assert_eq!(*ctx.play_state.lock().unwrap(), PlayerState::Playing);
        assert_eq!(ctx.position_ms.load(Ordering::SeqCst), 0);
        assert_eq!(events.try_recv().ok(), Some(PlayerEvent::Finished));
    }

    #[test]
    fn thread_entry_publishes_finished() {
        let (ctx, events) = context(PlayerState::Playing, 1);
        let state = ctx.play_state.clone();
        let position = ctx.position_ms.clone();
        *ctx.settings.lock().unwrap() = PlaybackSettings {
            hold_duration_s: 0.01,
            ..PlaybackSettings::default()
        };

        run_playback_thread(ctx, 1, 0);

        assert_eq!(*state.lock().unwrap(), PlayerState::Finished);
        assert_eq!(position.load(Ordering::SeqCst), 40);
        assert!(events.try_iter().any(|event| event == PlayerEvent::Finished));
    }

    #[test]
    fn runaway_trips_only_past_the_margin() {
        let within = check_runaway(1_000, 250, 1.0, Duration::from_millis(11_000), MARGIN);
        assert_eq!(within, None);

        let over = check_runaway(1_000, 250, 1.0, Duration::from_millis(11_300), MARGIN);
        assert_eq!(over, Some((1_250, 11_300)));
    }

    #[test]
    fn runaway_expectation_follows_speed() {
        let over = check_runaway(4_000, 0, 2.0, Duration::from_millis(12_100), MARGIN);
        assert_eq!(over, Some((2_000, 12_100)));
        assert_eq!(
            check_runaway(4_000, 0, 0.5, Duration::from_millis(12_100), MARGIN),
            None
        );
    }

    #[test]
    fn runaway_guard_skips_empty_songs_and_disabled_margin() {
        assert_eq!(
            check_runaway(0, 250, 1.0, Duration::from_secs(60), MARGIN),
            None
        );
        assert_eq!(
            check_runaway(1_000, 250, 1.0, Duration::from_secs(60), None),
            None
        );
    }
}
