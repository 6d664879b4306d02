//! Drop guards that finish a firing on every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::ActionExecutor;

/// Releases the key and clears its held flag when the firing ends.
pub(super) struct ReleaseGuard<'a> {
    executor: &'a ActionExecutor,
    key: &'a str,
}

impl<'a> ReleaseGuard<'a> {
    pub(super) fn new(executor: &'a ActionExecutor, key: &'a str) -> Self {
        Self { executor, key }
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.executor.finish(self.key);
    }
}

/// Keeps the in-flight counter in step with firing threads.
pub(super) struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl InFlightGuard {
    /// Adopt a slot that was reserved with `fetch_add` before spawning.
    pub(super) fn adopt(count: Arc<AtomicUsize>) -> Self {
        Self { count }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}
