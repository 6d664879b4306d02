//! High-level transport controller for the Pianola library.

mod controls;
mod runtime;
mod settings;

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;

use crate::actuator::KeyActuator;
use crate::config::{PlaybackSettings, PlayerConfig};
use crate::error::Result;
use crate::keymap::KeyMapping;
use crate::playback::events::{EventSink, PlayerEvent, EVENT_CAPACITY};
use crate::playback::executor::ActionExecutor;
use crate::playback::signals::RunSignals;
use crate::timeline::Timeline;

/// High-level playback state for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing has been played yet.
    Idle,
    Playing,
    Paused,
    Stopped,
    Finished,
    /// Playback was cut short: it overran its expected run time or the
    /// scheduler thread panicked.
    Aborted,
}

impl PlayerState {
    /// `true` while a scheduler run is alive (playing or paused).
    pub fn is_active(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }
}

/// Snapshot of playback position for UI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current_ms: u64,
    pub total_ms: u64,
    pub state: PlayerState,
}

/// Primary playback controller.
///
/// `Player` owns the scheduler thread, the action executor and the runtime
/// settings. Clones share the same underlying state, so a clone can be handed
/// to a UI thread while another thread drives the transport.
#[derive(Clone)]
pub struct Player {
    source: Arc<Mutex<Option<PathBuf>>>,
    timeline: Arc<Mutex<Option<Arc<Timeline>>>>,
    key_mapping: Arc<Mutex<Option<Arc<KeyMapping>>>>,
    state: Arc<Mutex<PlayerState>>,
    transport: Arc<Mutex<()>>,
    signals: Arc<Mutex<Arc<RunSignals>>>,
    position_ms: Arc<AtomicU64>,
    total_ms: Arc<AtomicU64>,
    pending_seek: Arc<Mutex<Option<u64>>>,
    settings: Arc<Mutex<PlaybackSettings>>,
    settings_generation: Arc<AtomicU64>,
    executor: ActionExecutor,
    events_tx: EventSink,
    events_rx: Receiver<PlayerEvent>,
    playback_id: Arc<AtomicU64>,
    playback_thread_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Player {
    /// Create a player with default settings that passes action ids straight
    /// to `actuator`.
    pub fn new(actuator: Arc<dyn KeyActuator>) -> Self {
        Self::build(actuator, PlayerConfig::default())
    }

    /// Create a player from a validated configuration.
    pub fn with_config(actuator: Arc<dyn KeyActuator>, config: PlayerConfig) -> Result<Self> {
        config.playback.validate()?;
        Ok(Self::build(actuator, config))
    }

    /// Create a player with default settings and `timeline` already loaded.
    pub fn from_timeline(timeline: Timeline, actuator: Arc<dyn KeyActuator>) -> Self {
        let player = Self::new(actuator);
        player.load_timeline(timeline);
        player
    }

    fn build(actuator: Arc<dyn KeyActuator>, config: PlayerConfig) -> Self {
        let (events_tx, events_rx) = EventSink::new(EVENT_CAPACITY);
        let executor = ActionExecutor::new(actuator, events_tx.clone(), config.playback.settle());

        Self {
            source: Arc::new(Mutex::new(None)),
            timeline: Arc::new(Mutex::new(None)),
            key_mapping: Arc::new(Mutex::new(config.key_mapping.map(Arc::new))),
            state: Arc::new(Mutex::new(PlayerState::Idle)),
            transport: Arc::new(Mutex::new(())),
            signals: Arc::new(Mutex::new(Arc::new(RunSignals::new()))),
            position_ms: Arc::new(AtomicU64::new(0)),
            total_ms: Arc::new(AtomicU64::new(0)),
            pending_seek: Arc::new(Mutex::new(None)),
            settings: Arc::new(Mutex::new(config.playback)),
            settings_generation: Arc::new(AtomicU64::new(0)),
            executor,
            events_tx,
            events_rx,
            playback_id: Arc::new(AtomicU64::new(0)),
            playback_thread_handle: Arc::new(Mutex::new(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackSettings;
    use crate::error::{ActuatorError, ConfigError, PlayerError};
    use crate::test_support::{timeline, Action, RecordingActuator};
    use crate::timeline::Event;
    use std::io::Write;
    use std::thread;
    use std::time::{Duration, Instant};

    const DONE: Duration = Duration::from_secs(5);

    fn player_with(
        actuator: &Arc<RecordingActuator>,
        events: &[(u64, &str)],
        speed: f64,
        hold_duration_s: f64,
    ) -> Player {
        let config = PlayerConfig {
            playback: PlaybackSettings {
                speed,
                hold_duration_s,
                ..PlaybackSettings::default()
            },
            key_mapping: None,
        };
        let player = Player::with_config(actuator.clone(), config).unwrap();
        player.load_timeline(timeline(events));
        player
    }

    fn drain(player: &Player) -> Vec<PlayerEvent> {
        player.events().try_iter().collect()
    }

    #[test]
    fn plays_simultaneous_and_repeated_actions() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "A"), (0, "B"), (500, "A")], 1.0, 0.25);

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert!(player.wait_for_releases(DONE));

        assert_eq!(player.get_state(), PlayerState::Finished);
        assert_eq!(
            actuator.actions_for("A"),
            vec![Action::Press, Action::Release, Action::Press, Action::Release]
        );
        assert_eq!(actuator.actions_for("B"), vec![Action::Press, Action::Release]);

        let presses = actuator.presses_of("A");
        let releases = actuator.releases_of("A");
        let gap = presses[1] - presses[0];
        assert!(gap >= Duration::from_millis(480), "gap was {:?}", gap);
        assert!(gap < Duration::from_millis(700), "gap was {:?}", gap);
        assert!(releases[0] - presses[0] >= Duration::from_millis(250));

        let b_press = actuator.presses_of("B")[0];
        let skew = if b_press > presses[0] {
            b_press - presses[0]
        } else {
            presses[0] - b_press
        };
        assert!(skew < Duration::from_millis(50));

        let progress = player.get_progress();
        assert_eq!(progress.current_ms, 500);
        assert_eq!(progress.total_ms, 500);
        assert!(drain(&player).contains(&PlayerEvent::Finished));
        assert!(player.held_keys().is_empty());
    }

    #[test]
    fn speed_scales_total_run_time() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (400, "a")], 2.0, 0.05);

        let start = Instant::now();
        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(200), "took {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);
        let presses = actuator.presses_of("a");
        let gap = presses[1] - presses[0];
        assert!(gap >= Duration::from_millis(190), "gap was {:?}", gap);
        assert!(gap < Duration::from_millis(350), "gap was {:?}", gap);
    }

    #[test]
    fn speed_change_applies_mid_run() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (1_000, "b")], 1.0, 0.05);

        player.play().unwrap();
        thread::sleep(Duration::from_millis(100));
        player.set_speed(4.0).unwrap();
        assert!(player.wait_until_done(DONE));

        let gap = actuator.presses_of("b")[0] - actuator.presses_of("a")[0];
        assert!(gap >= Duration::from_millis(250), "gap was {:?}", gap);
        assert!(gap < Duration::from_millis(650), "gap was {:?}", gap);
    }

    #[test]
    fn paused_time_is_excluded_from_the_schedule() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (300, "b")], 1.0, 0.05);

        player.play().unwrap();
        thread::sleep(Duration::from_millis(100));
        player.pause();
        assert_eq!(player.get_state(), PlayerState::Paused);

        thread::sleep(Duration::from_millis(50));
        let paused_at = player.get_time_ms();
        thread::sleep(Duration::from_millis(250));
        assert_eq!(player.get_time_ms(), paused_at);
        assert!(actuator.presses_of("b").is_empty());

        player.resume();
        assert_eq!(player.get_state(), PlayerState::Playing);
        assert!(player.wait_until_done(DONE));

        let gap = actuator.presses_of("b")[0] - actuator.presses_of("a")[0];
        assert!(gap >= Duration::from_millis(550), "gap was {:?}", gap);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (2_000, "b")], 1.0, 0.05);

        player.pause();
        player.resume();
        assert_eq!(player.get_state(), PlayerState::Idle);

        player.play().unwrap();
        player.play().unwrap();
        assert_eq!(player.get_state(), PlayerState::Playing);
        player.resume();
        assert_eq!(player.get_state(), PlayerState::Playing);

        player.pause();
        player.pause();
        assert_eq!(player.get_state(), PlayerState::Paused);

        player.play().unwrap();
        assert_eq!(player.get_state(), PlayerState::Playing);

        player.stop();
        assert_eq!(player.get_state(), PlayerState::Stopped);
        assert!(player.is_finished());
    }

    #[test]
    fn seek_then_stop_keeps_target_when_stopped() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (2_000, "b")], 1.0, 0.05);

        assert_eq!(player.seek(1_500), 1_500);
        player.stop();
        assert_eq!(player.get_time_ms(), 1_500);

        assert_eq!(player.seek(9_000), 2_000);
        assert_eq!(player.get_time_ms(), 2_000);
    }

    #[test]
    fn seek_then_stop_keeps_target_when_paused() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (2_000, "b")], 1.0, 0.05);

        player.play().unwrap();
        thread::sleep(Duration::from_millis(50));
        player.pause();
        player.seek(1_200);
        assert_eq!(player.get_time_ms(), 1_200);
        player.stop();

        assert_eq!(player.get_time_ms(), 1_200);
        assert_eq!(player.get_state(), PlayerState::Stopped);
    }

    #[test]
    fn seek_then_stop_keeps_target_when_playing() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (2_000, "b")], 1.0, 0.05);

        player.play().unwrap();
        thread::sleep(Duration::from_millis(50));
        player.seek(1_200);
        player.stop();

        let position = player.get_time_ms();
        assert!((1_200..1_260).contains(&position), "position was {}", position);
        assert!(actuator.presses_of("b").is_empty());
    }

    #[test]
    fn play_starts_from_a_seeked_position() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (300, "b"), (400, "c")], 1.0, 0.05);

        player.seek(250);
        player.play().unwrap();
        assert!(player.wait_until_done(DONE));

        assert!(actuator.presses_of("a").is_empty());
        assert_eq!(actuator.presses_of("b").len(), 1);
        assert_eq!(actuator.presses_of("c").len(), 1);
    }

    #[test]
    fn play_from_the_last_event_starts_over() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (100, "b")], 1.0, 0.02);

        assert_eq!(player.seek(100), 100);
        player.stop();
        assert_eq!(player.get_time_ms(), 100);

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert_eq!(actuator.presses_of("a").len(), 1);
        assert_eq!(actuator.presses_of("b").len(), 1);
    }

    #[test]
    fn overrunning_the_expected_run_time_aborts() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (50, "b")], 1.0, 0.02);
        player.set_runaway_margin(Some(Duration::ZERO));

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));

        assert_eq!(player.get_state(), PlayerState::Aborted);
        let events = drain(&player);
        assert!(events
            .iter()
            .any(|event| matches!(event, PlayerEvent::RuntimeExceeded { .. })));
        assert!(!events.contains(&PlayerEvent::Finished));
        assert!(player.held_keys().is_empty());
    }

    #[test]
    fn unrepresentable_settings_never_reach_the_scheduler() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (50, "b")], 1.0, 0.02);

        assert!(player.set_hold_duration(1e20).is_err());
        assert!(player.set_speed(1e-30).is_err());
        assert!(player.set_speed(1e30).is_err());
        player.set_runaway_margin(Some(Duration::MAX));
        assert!(matches!(
            player.play(),
            Err(PlayerError::Config(ConfigError::InvalidRunawayMargin(_)))
        ));
        assert_eq!(player.get_state(), PlayerState::Idle);

        player.set_runaway_margin(None);
        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert_eq!(player.get_state(), PlayerState::Finished);
    }

    #[test]
    fn unread_events_stay_bounded() {
        let notes: Vec<(u64, String)> = (0..EVENT_CAPACITY as u64 + 40)
            .map(|ms| (ms, format!("k{}", ms)))
            .collect();
        let failing: Vec<&str> = notes.iter().map(|(_, key)| key.as_str()).collect();
        let events: Vec<(u64, &str)> = notes
            .iter()
            .map(|(ms, key)| (*ms, key.as_str()))
            .collect();

        let actuator = Arc::new(RecordingActuator::failing_press(&failing));
        let player = player_with(&actuator, &events, 4.0, 0.01);

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert!(player.wait_for_releases(DONE));

        let queued = drain(&player);
        assert!(queued.len() <= EVENT_CAPACITY);
        assert!(queued.contains(&PlayerEvent::Finished));
    }

    #[test]
    fn replay_after_finish_starts_over() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a"), (50, "b")], 1.0, 0.02);

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert_eq!(player.get_state(), PlayerState::Finished);

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert_eq!(actuator.presses_of("a").len(), 2);
        assert_eq!(actuator.presses_of("b").len(), 2);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a")], 1.0, 0.25);

        assert!(matches!(
            player.set_speed(0.0),
            Err(PlayerError::Config(ConfigError::InvalidSpeed(_)))
        ));
        assert!(matches!(
            player.set_speed(f64::NAN),
            Err(PlayerError::Config(ConfigError::InvalidSpeed(_)))
        ));
        assert!(matches!(
            player.set_hold_duration(-1.0),
            Err(PlayerError::Config(ConfigError::InvalidHoldDuration(_)))
        ));
        assert_eq!(player.get_speed(), 1.0);
        assert_eq!(player.get_hold_duration(), 0.25);

        let config = PlayerConfig {
            playback: PlaybackSettings {
                speed: -2.0,
                ..PlaybackSettings::default()
            },
            key_mapping: None,
        };
        assert!(Player::with_config(actuator, config).is_err());
    }

    #[test]
    fn empty_timeline_is_nothing_to_play() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = Player::from_timeline(
            Timeline::from_events(Vec::<Event>::new()),
            actuator.clone(),
        );

        player.play().unwrap();
        assert_eq!(player.get_state(), PlayerState::Idle);
        assert!(player.is_finished());
        assert!(actuator.entries().is_empty());
    }

    #[test]
    fn play_without_a_song_fails() {
        let player = Player::new(Arc::new(RecordingActuator::new()));
        assert!(matches!(player.play(), Err(PlayerError::NothingLoaded)));
    }

    #[test]
    fn source_is_loaded_lazily_and_mapped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"demo","songNotes":[{{"key":"1Key0","time":0}},{{"key":"1Key6","time":40}},{{"key":"1Key99","time":60}}]}}]"#
        )
        .unwrap();

        let actuator = Arc::new(RecordingActuator::new());
        let config = PlayerConfig {
            playback: PlaybackSettings {
                hold_duration_s: 0.02,
                ..PlaybackSettings::default()
            },
            key_mapping: Some(KeyMapping::default()),
        };
        let player = Player::with_config(actuator.clone(), config).unwrap();
        player.set_source(file.path());
        assert!(player.timeline().is_none());

        player.play().unwrap();
        assert_eq!(player.get_duration_ms(), 60);
        assert!(player.wait_until_done(DONE));
        assert!(player.wait_for_releases(DONE));

        assert_eq!(actuator.actions_for("y"), vec![Action::Press, Action::Release]);
        assert_eq!(actuator.actions_for("j"), vec![Action::Press, Action::Release]);
        assert!(actuator.actions_for("1Key99").is_empty());
        assert_eq!(actuator.entries().len(), 4);
    }

    #[test]
    fn stop_force_releases_held_keys() {
        let actuator = Arc::new(RecordingActuator::new());
        let player = player_with(&actuator, &[(0, "a")], 1.0, 2.0);

        player.play().unwrap();
        thread::sleep(Duration::from_millis(80));
        assert_eq!(player.held_keys(), vec!["a".to_string()]);

        player.stop();
        assert!(player.held_keys().is_empty());
        assert_eq!(player.get_state(), PlayerState::Stopped);
        assert_eq!(
            actuator.actions_for("a")[..2],
            [Action::Press, Action::Release]
        );
        assert!(drain(&player).contains(&PlayerEvent::Stopped));
    }

    #[test]
    fn actuator_failures_are_reported() {
        let actuator = Arc::new(RecordingActuator::failing_press(&["a"]));
        let player = player_with(&actuator, &[(0, "a"), (20, "b")], 1.0, 0.02);

        player.play().unwrap();
        assert!(player.wait_until_done(DONE));
        assert!(player.wait_for_releases(DONE));

        let events = drain(&player);
        assert!(events.iter().any(|event| matches!(
            event,
            PlayerEvent::ActuatorFailed(ActuatorError::Press { key, .. }) if key == "a"
        )));
        assert!(events.contains(&PlayerEvent::Finished));
        assert_eq!(actuator.actions_for("b"), vec![Action::Press, Action::Release]);
        assert!(player.held_keys().is_empty());
    }
}
