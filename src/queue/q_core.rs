use std::sync::Arc;
use tokio::sync::broadcast;
use crate::queue::types::*;
use crate::queue::{DEFAULT_EVENT_BUFFER, DEFAULT_INITIAL_TICKET_COUNTER};

/// In-memory implementation of QueueStore.
/// Uses a Vec protected by RwLock for storing tickets and a broadcast channel
/// for real-time event notifications.
///
/// This implementation has the following characteristics:
/// - Thread-safe using Arc<RwLock<QueueState>> to share state between clones
/// - Writers take the write lock, so reservations are serialized
/// - Readers share the read lock and see a consistent snapshot
/// - Real-time notifications using tokio::sync::broadcast
pub struct MemoryQueue {
    /// Thread-safe shared queue state
    pub(super) state: Arc<parking_lot::RwLock<QueueState>>,
    /// Channel for broadcasting queue events to subscribers
    pub(super) event_tx: broadcast::Sender<QueueEvent>,
}

impl Clone for MemoryQueue {
    fn clone(&self) -> Self {
        // Clone just shares the Arc references, ensuring all clones
        // operate on the same underlying data
        Self {
            state: self.state.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER, DEFAULT_INITIAL_TICKET_COUNTER, true)
    }
}

impl MemoryQueue {
    /// Creates an empty queue whose first reservation gets `initial_counter`.
    pub fn new(event_buffer: usize, initial_counter: u64, distribution_enabled: bool) -> Self {
        let (tx, _) = broadcast::channel(event_buffer.max(1));

        log::info!(
            "Creating MemoryQueue (first ticket: {}, distribution enabled: {})",
            initial_counter,
            distribution_enabled
        );

        Self {
            state: Arc::new(parking_lot::RwLock::new(QueueState::new(
                initial_counter,
                distribution_enabled,
            ))),
            event_tx: tx,
        }
    }

    /// Creates a queue from the store configuration.
    pub fn from_config(config: &crate::config::QueueConfig) -> Self {
        Self::new(
            config.event_buffer,
            config.initial_ticket_counter,
            config.distribution_enabled,
        )
    }

    pub(super) fn emit(&self, event: QueueEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
