// Re-export all necessary types and interfaces
mod types;
mod q_core;
mod q_impl;

// Public exports from the queue module
pub use types::*;
pub use q_core::MemoryQueue;

// Constants
/// Default number of queue events buffered per subscriber
pub const DEFAULT_EVENT_BUFFER: usize = 100;

/// Default id of the first ticket handed out
pub const DEFAULT_INITIAL_TICKET_COUNTER: u64 = 1;
