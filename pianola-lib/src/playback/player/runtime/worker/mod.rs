//! Scheduler worker internals.
//!
//! - [`context`] defines captured shared thread state.
//! - [`guard`] force-releases keys however the run ends.
//! - [`runner`] executes the long-running tick/fire/wait loop.

mod context;
mod guard;
mod runner;

pub(in crate::playback::player::runtime) use context::ThreadContext;
pub(in crate::playback::player::runtime) use runner::run_playback_thread;
