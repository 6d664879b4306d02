//! Error types shared across the library.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`KeyActuator`](crate::actuator::KeyActuator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("failed to press key {key:?}: {reason}")]
    Press { key: String, reason: String },

    #[error("failed to release key {key:?}: {reason}")]
    Release { key: String, reason: String },
}

/// Errors raised while reading or recognising a song file.
#[derive(Error, Debug)]
pub enum SongError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("song text is not valid UTF-8 or UTF-16")]
    Encoding,

    #[error("invalid song JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized song file format")]
    UnrecognizedFormat,
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("speed multiplier must be between 0.01 and 100, got {0}")]
    InvalidSpeed(f64),

    #[error("hold duration must be above 0 and at most 60 seconds, got {0}")]
    InvalidHoldDuration(f64),

    #[error("runaway margin must be between 0 and 86400 seconds, got {0}")]
    InvalidRunawayMargin(f64),
}

/// Errors returned by the transport controller.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Song(#[from] SongError),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error("no song loaded")]
    NothingLoaded,

    #[error("failed to start playback thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
