//! Cleanup guard for scheduler threads.

use log::debug;

use crate::playback::executor::ActionExecutor;

/// Force-releases every held key when the scheduler run ends, including
/// when the loop unwinds.
pub(super) struct RunCleanupGuard {
    executor: ActionExecutor,
}

impl RunCleanupGuard {
    pub(super) fn new(executor: ActionExecutor) -> Self {
        Self { executor }
    }
}

impl Drop for RunCleanupGuard {
    fn drop(&mut self) {
        let released = self.executor.release_all();
        if released > 0 {
            debug!("released {} held key(s) at end of run", released);
        }
    }
}
