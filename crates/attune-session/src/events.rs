//! Broadcast fan-out of session events.
//!
//! The session and the affect samplers emit; a chat surface or the
//! statistics view subscribes. Emitting is non-blocking and infallible:
//! with no subscribers the event is dropped, and a slow subscriber lags
//! (losing the oldest events) rather than back-pressuring the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use attune_core::events::SessionEvent;
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Debug)]
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Emitter with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Emitter with an explicit per-subscriber buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Broadcast one event, returning how many subscribers got it.
    pub fn emit(&self, event: SessionEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Open a subscription receiving events from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total events emitted since construction, delivered or not.
    #[must_use]
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
