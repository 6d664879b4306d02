//! Mapping between virtual (song) time and wall-clock time.

use std::time::{Duration, Instant};

use crate::config::seconds_to_duration;

/// Furthest a deadline is placed past the anchor.
const MAX_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Wall-clock duration that `virtual_ms` of song time takes at `speed`.
///
/// Saturates at `Duration::MAX`.
pub(crate) fn virtual_to_wall(virtual_ms: u64, speed: f64) -> Duration {
    seconds_to_duration(virtual_ms as f64 / 1000.0 / speed)
}

/// Keeps `now - reference ≈ virtual / speed`.
///
/// The reference point is kept as an anchor instant plus the wall offset of
/// the virtual time at that anchor, which avoids subtracting from `Instant`.
#[derive(Debug, Clone)]
pub(crate) struct SyncClock {
    anchor: Instant,
    offset: Duration,
    speed: f64,
}

impl SyncClock {
    pub(crate) fn new(virtual_ms: u64, speed: f64) -> Self {
        Self {
            anchor: Instant::now(),
            offset: virtual_to_wall(virtual_ms, speed),
            speed,
        }
    }

    /// Re-anchor so that `virtual_ms` corresponds to now.
    pub(crate) fn rebase(&mut self, virtual_ms: u64, speed: f64) {
        *self = Self::new(virtual_ms, speed);
    }

    pub(crate) fn speed(&self) -> f64 {
        self.speed
    }

    /// Wall time elapsed since the reference point.
    pub(crate) fn elapsed(&self) -> Duration {
        self.offset.saturating_add(self.anchor.elapsed())
    }

    /// Wall time that should have elapsed when `virtual_ms` is reached.
    pub(crate) fn target_elapsed(&self, virtual_ms: u64) -> Duration {
        virtual_to_wall(virtual_ms, self.speed)
    }

    /// Instant at which `virtual_ms` is due.
    pub(crate) fn deadline(&self, virtual_ms: u64) -> Instant {
        let wait = self
            .target_elapsed(virtual_ms)
            .saturating_sub(self.offset)
            .min(MAX_DEADLINE);
        self.anchor + wait
    }
}
