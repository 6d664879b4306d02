//! Playback runtime: scheduler, action executor and transport controller.

pub mod events;
pub mod executor;
pub mod player;
pub(crate) mod signals;
