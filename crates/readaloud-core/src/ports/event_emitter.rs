//! Event emitter trait for session lifecycle broadcasting.
//!
//! Implementations handle transport details (extension message bus,
//! channels, logs).

use tokio::sync::mpsc;

use crate::events::ReaderEvent;

/// Trait for emitting reader events.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts without listeners
/// - `ChannelEmitter` - Forwards into a tokio channel
pub trait ReaderEventEmitter: Send + Sync {
    /// Emit an event. Must not block.
    fn emit(&self, event: ReaderEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn ReaderEventEmitter>;
}

/// Discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub const fn new() -> Self {
        Self
    }
}

impl ReaderEventEmitter for NoopEmitter {
    fn emit(&self, _event: ReaderEvent) {}

    fn clone_box(&self) -> Box<dyn ReaderEventEmitter> {
        Box::new(self.clone())
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<ReaderEvent>,
}

impl ChannelEmitter {
    /// Create the emitter and the receiver listeners read from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReaderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReaderEventEmitter for ChannelEmitter {
    fn emit(&self, event: ReaderEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Reader event receiver dropped");
        }
    }

    fn clone_box(&self) -> Box<dyn ReaderEventEmitter> {
        Box::new(self.clone())
    }
}
