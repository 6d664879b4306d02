//! # Pianola Library
//!
//! This library replays timestamped key-action songs against a pluggable key
//! actuator. It includes modules for timeline indexing, song loading, key
//! mapping, playback configuration and the real-time playback runtime.

pub mod actuator;
pub mod config;
pub mod error;
pub mod keymap;
pub mod playback;
pub mod song;
pub mod timeline;
mod tools;

#[cfg(test)]
mod test_support;

pub use actuator::{KeyActuator, LogActuator};
pub use config::{PlaybackSettings, PlayerConfig};
pub use error::{ActuatorError, ConfigError, PlayerError, Result, SongError};
pub use keymap::KeyMapping;
pub use playback::events::PlayerEvent;
pub use playback::player::{Player, PlayerState, Progress};
pub use timeline::{BuildReport, Event, NoteRecord, Timeline};
