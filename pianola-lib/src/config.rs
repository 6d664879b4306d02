//! Playback configuration.
//!
//! Settings are plain serde structs so they can come from a JSON file, a CLI,
//! or be built in code. Every field has a default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keymap::KeyMapping;

const DEFAULT_SPEED: f64 = 1.0;
const DEFAULT_HOLD_DURATION_S: f64 = 0.25;
const DEFAULT_SETTLE_MS: u64 = 5;
const DEFAULT_RUNAWAY_MARGIN_S: f64 = 10.0;
const DEFAULT_STOP_TIMEOUT_MS: u64 = 500;

/// Accepted speed multipliers.
pub const SPEED_RANGE: (f64, f64) = (0.01, 100.0);
/// Longest accepted hold, in seconds.
pub const MAX_HOLD_DURATION_S: f64 = 60.0;
/// Longest accepted runaway margin, in seconds.
pub const MAX_RUNAWAY_MARGIN_S: f64 = 86_400.0;

/// Runtime knobs read by the scheduler and executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Virtual-to-wall time ratio. `2.0` plays twice as fast.
    pub speed: f64,
    /// How long each key is held, in wall-clock seconds.
    pub hold_duration_s: f64,
    /// Pause between releasing and re-pressing a key that is still held.
    pub settle_ms: u64,
    /// Overrun beyond the expected run time after which playback is aborted.
    /// `None` disables the guard.
    pub runaway_margin_s: Option<f64>,
    /// Upper bound on how long `stop` waits for the scheduler thread.
    pub stop_timeout_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            hold_duration_s: DEFAULT_HOLD_DURATION_S,
            settle_ms: DEFAULT_SETTLE_MS,
            runaway_margin_s: Some(DEFAULT_RUNAWAY_MARGIN_S),
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

impl PlaybackSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_speed(self.speed)?;
        validate_hold_duration(self.hold_duration_s)?;
        if let Some(margin) = self.runaway_margin_s {
            if !(0.0..=MAX_RUNAWAY_MARGIN_S).contains(&margin) {
                return Err(ConfigError::InvalidRunawayMargin(margin));
            }
        }
        Ok(())
    }

    pub fn hold_duration(&self) -> Duration {
        seconds_to_duration(self.hold_duration_s)
    }

    /// Hold duration expressed in whole virtual milliseconds.
    pub fn hold_ms(&self) -> u64 {
        (self.hold_duration_s * 1000.0).round() as u64
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn runaway_margin(&self) -> Option<Duration> {
        self.runaway_margin_s.map(seconds_to_duration)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Seconds to a `Duration`, saturating instead of panicking on values a
/// `Duration` cannot hold.
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) => duration,
        Err(_) if seconds > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

pub(crate) fn validate_speed(speed: f64) -> Result<(), ConfigError> {
    let (min, max) = SPEED_RANGE;
    if (min..=max).contains(&speed) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSpeed(speed))
    }
}

pub(crate) fn validate_hold_duration(seconds: f64) -> Result<(), ConfigError> {
    if seconds > 0.0 && seconds <= MAX_HOLD_DURATION_S {
        Ok(())
    } else {
        Err(ConfigError::InvalidHoldDuration(seconds))
    }
}

/// On-disk configuration: playback settings plus an optional key table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    #[serde(flatten)]
    pub playback: PlaybackSettings,
    pub key_mapping: Option<KeyMapping>,
}

impl PlayerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.playback.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Configuration with the default 15-key table filled in.
    pub fn with_default_mapping() -> Self {
        Self {
            playback: PlaybackSettings::default(),
            key_mapping: Some(KeyMapping::default()),
        }
    }
}
