//! Shared runtime context captured at thread spawn time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::PlaybackSettings;
use crate::keymap::KeyMapping;
use crate::playback::events::EventSink;
use crate::playback::executor::ActionExecutor;
use crate::playback::signals::RunSignals;
use crate::timeline::Timeline;

use super::super::super::PlayerState;

/// Captured shared state passed from `Player::initialize_thread` into the
/// scheduler thread.
pub(in crate::playback::player::runtime) struct ThreadContext {
    pub(in crate::playback::player::runtime) timeline: Arc<Timeline>,
    pub(in crate::playback::player::runtime) key_mapping: Option<Arc<KeyMapping>>,
    pub(in crate::playback::player::runtime) signals: Arc<RunSignals>,
    pub(in crate::playback::player::runtime) play_state: Arc<Mutex<PlayerState>>,
    pub(in crate::playback::player::runtime) position_ms: Arc<AtomicU64>,
    pub(in crate::playback::player::runtime) pending_seek: Arc<Mutex<Option<u64>>>,
    pub(in crate::playback::player::runtime) settings: Arc<Mutex<PlaybackSettings>>,
    pub(in crate::playback::player::runtime) settings_generation: Arc<AtomicU64>,
    pub(in crate::playback::player::runtime) executor: ActionExecutor,
    pub(in crate::playback::player::runtime) events: EventSink,
    pub(in crate::playback::player::runtime) playback_id_atomic: Arc<AtomicU64>,
}

impl ThreadContext {
    /// Actuator key for `action_id`, or `None` when the mapping has no entry.
    pub(in crate::playback::player::runtime) fn resolve_key<'a>(
        &'a self,
        action_id: &'a str,
    ) -> Option<&'a str> {
        match &self.key_mapping {
            Some(mapping) => mapping.resolve(action_id),
            None => Some(action_id),
        }
    }

    /// Settings snapshot together with the generation it was read at.
    pub(in crate::playback::player::runtime) fn read_settings(&self) -> (PlaybackSettings, u64) {
        let settings = self.settings.lock().unwrap();
        let generation = self.settings_generation.load(Ordering::SeqCst);
        (settings.clone(), generation)
    }

    /// `true` while this run is still the player's current one.
    pub(in crate::playback::player::runtime) fn is_current(&self, playback_id: u64) -> bool {
        self.playback_id_atomic.load(Ordering::SeqCst) == playback_id
    }
}
