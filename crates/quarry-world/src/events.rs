//! Notifications emitted after the world state changes.
//!
//! The [`World`](crate::World) reports every applied mutation to an optional
//! [`WorldListener`] after releasing its lock, so listeners may query the
//! world again. [`EventChannel`] hands events to another thread without
//! blocking the update path.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::addressing::{BlockPos, ColumnPos, LocalPos};
use crate::error::ListenerError;
use crate::section::BlockState;

/// A committed change to the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A column was inserted or replaced.
    ColumnLoaded(ColumnPos),
    /// A column is about to be removed.
    ColumnUnloaded(ColumnPos),
    /// A single block changed.
    VoxelChanged {
        /// Absolute position of the block.
        pos: BlockPos,
        /// The state now stored there.
        state: BlockState,
    },
    /// One entry of a section batch was applied.
    BatchVoxelChanged {
        /// Column holding the section.
        column: ColumnPos,
        /// Section index within the column (0 = bottom).
        section: i32,
        /// Position inside the section.
        local: LocalPos,
        /// The state now stored there.
        state: BlockState,
    },
}

/// Receives [`WorldEvent`]s synchronously on the mutating thread.
///
/// An error is returned to whoever applied the mutation; the mutation itself
/// is kept.
pub trait WorldListener: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &WorldEvent) -> Result<(), ListenerError>;
}

impl<F> WorldListener for F
where
    F: Fn(&WorldEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &WorldEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Forwards events into a bounded channel.
///
/// A full channel drops the event and counts it rather than stalling the
/// writer. A disconnected receiver is reported as a listener error.
pub struct EventChannel {
    sender: Sender<WorldEvent>,
    dropped: AtomicU64,
}

impl EventChannel {
    /// Creates a channel holding at most `capacity` undelivered events.
    pub fn bounded(capacity: usize) -> (Self, Receiver<WorldEvent>) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Events discarded because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl WorldListener for EventChannel {
    fn on_event(&self, event: &WorldEvent) -> Result<(), ListenerError> {
        match self.sender.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!("Event queue full, dropped {:?} ({} total)", event, dropped);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err("event receiver disconnected".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_delivers_in_order() {
        let (channel, receiver) = EventChannel::bounded(4);
        channel
            .on_event(&WorldEvent::ColumnLoaded(ColumnPos::new(1, 2)))
            .unwrap();
        channel
            .on_event(&WorldEvent::ColumnUnloaded(ColumnPos::new(1, 2)))
            .unwrap();

        let got: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            got,
            vec![
                WorldEvent::ColumnLoaded(ColumnPos::new(1, 2)),
                WorldEvent::ColumnUnloaded(ColumnPos::new(1, 2)),
            ]
        );
    }

    #[test]
    fn test_full_channel_drops_without_error() {
        let (channel, receiver) = EventChannel::bounded(1);
        let event = WorldEvent::ColumnLoaded(ColumnPos::new(0, 0));
        channel.on_event(&event).unwrap();
        channel.on_event(&event).unwrap();
        channel.on_event(&event).unwrap();
        assert_eq!(channel.dropped(), 2);
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn test_disconnected_receiver_is_an_error() {
        let (channel, receiver) = EventChannel::bounded(1);
        drop(receiver);
        let result = channel.on_event(&WorldEvent::ColumnLoaded(ColumnPos::new(0, 0)));
        assert!(result.is_err());
    }

    #[test]
    fn test_closure_listener() {
        let listener = |event: &WorldEvent| -> Result<(), ListenerError> {
            match event {
                WorldEvent::ColumnUnloaded(_) => Err("refused".into()),
                _ => Ok(()),
            }
        };
        assert!(listener.on_event(&WorldEvent::ColumnLoaded(ColumnPos::new(0, 0))).is_ok());
        let err = listener
            .on_event(&WorldEvent::ColumnUnloaded(ColumnPos::new(0, 0)))
            .unwrap_err();
        assert_eq!(err.to_string(), "refused");
    }
}
