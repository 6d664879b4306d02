//! Notifications pushed from the playback runtime to consumers.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::ActuatorError;

/// Most notifications kept for a consumer that is not reading.
pub const EVENT_CAPACITY: usize = 256;

/// Something that happened during playback.
///
/// Delivered through the channel returned by
/// [`Player::events`](crate::playback::player::Player::events).
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A press or release failed; the key has still been cleaned up.
    ActuatorFailed(ActuatorError),
    /// Virtual time passed the last event plus one hold duration.
    Finished,
    /// The run was cancelled by `stop`.
    Stopped,
    /// Wall time overran the expected run time by more than the margin.
    RuntimeExceeded { expected_ms: u64, elapsed_ms: u64 },
    /// The scheduler thread panicked; held keys were released.
    SchedulerPanicked,
}

/// Sending half of the player's notification queue.
///
/// The queue is bounded. When it is full the oldest notification is
/// discarded, so terminal events always reach a late reader.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<PlayerEvent>,
    overflow: Receiver<PlayerEvent>,
}

impl EventSink {
    /// Create a sink and the receiver consumers read from.
    pub fn new(capacity: usize) -> (Self, Receiver<PlayerEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        let sink = Self {
            tx,
            overflow: rx.clone(),
        };
        (sink, rx)
    }

    /// Queue `event` without blocking.
    pub fn emit(&self, event: PlayerEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.overflow.try_recv();
                    event = rejected;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_drops_the_oldest_events() {
        let (sink, rx) = EventSink::new(3);
        for ms in 0..5 {
            sink.emit(PlayerEvent::RuntimeExceeded {
                expected_ms: ms,
                elapsed_ms: ms,
            });
        }
        sink.emit(PlayerEvent::Finished);

        let queued: Vec<PlayerEvent> = rx.try_iter().collect();
        assert_eq!(queued.len(), 3);
        assert_eq!(
            queued[0],
            PlayerEvent::RuntimeExceeded {
                expected_ms: 3,
                elapsed_ms: 3
            }
        );
        assert_eq!(queued.last(), Some(&PlayerEvent::Finished));
    }
}
