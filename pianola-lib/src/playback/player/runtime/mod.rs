//! Internal runtime plumbing for the `Player` scheduler thread.
//!
//! The runtime is split so construction-time concerns stay separate from the
//! long-lived real-time loop:
//! - [`thread`] handles thread bootstrap and shared state capture.
//! - [`worker`] runs the scheduling loop itself.

mod thread;
mod worker;
