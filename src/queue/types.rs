use tokio::sync::broadcast;
use crate::error::QueueError;
use crate::models::{Coordinate, QueueStats, Ticket, TicketId, TicketStatus};

/// Mutable state behind a queue store.
/// `tickets` keeps insertion order; readers sort by id.
#[derive(Debug, Clone)]
pub struct QueueState {
    /// Every ticket issued or seeded, in insertion order
    pub tickets: Vec<Ticket>,
    /// Id handed to the next reservation; always above every issued id
    pub next_ticket_counter: u64,
    /// Whether reservations are currently accepted
    pub distribution_enabled: bool,
}

impl QueueState {
    pub fn new(next_ticket_counter: u64, distribution_enabled: bool) -> Self {
        Self {
            tickets: Vec::new(),
            next_ticket_counter: next_ticket_counter.max(1),
            distribution_enabled,
        }
    }

    /// Tickets sorted ascending by numeric id.
    pub fn sorted(&self) -> Vec<Ticket> {
        let mut tickets = self.tickets.clone();
        tickets.sort_by_key(|ticket| ticket.id);
        tickets
    }

    pub fn contains(&self, id: TicketId) -> bool {
        self.tickets.iter().any(|ticket| ticket.id == id)
    }

    /// 1-based rank of `id` among all tickets ordered by id.
    pub fn position_of(&self, id: TicketId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        Some(self.tickets.iter().filter(|ticket| ticket.id < id).count() + 1)
    }
}

/// Event emitted when the queue state changes.
/// Broadcast to every subscriber.
#[derive(Clone, Debug, PartialEq)]
pub enum QueueEvent {
    /// A client reserved a new ticket
    Reserved(Ticket),
    /// A pre-existing ticket was loaded into the queue
    Inserted(Ticket),
    /// A ticket moved to a new status
    StatusChanged(Ticket),
    /// Distribution was switched on or off
    DistributionChanged(bool),
}

/// Trait defining the interface of the shared ticket queue.
/// This abstraction allows for different store implementations (memory, server-backed)
/// while keeping the same ordering and id invariants.
///
/// Reads never mutate and may run concurrently. Writes must be serialized by
/// the implementation so ids stay unique and the counter stays monotonic.
pub trait QueueStore: Send + Sync + 'static {
    /// All tickets sorted ascending by numeric id
    fn snapshot(&self) -> Vec<Ticket>;

    /// Ticket with the given id
    fn get(&self, id: TicketId) -> Option<Ticket>;

    /// Case-insensitive exact match on the trimmed display number
    fn find_by_display_number(&self, number: &str) -> Option<Ticket>;

    /// 1-based rank of the ticket in the ascending-by-id ordering
    fn position_of(&self, id: TicketId) -> Option<usize>;

    /// Issues the next ticket. Fails with `ReservationRejected` while distribution is stopped.
    fn reserve(&self, client_location: Coordinate, agency_name: &str) -> Result<Ticket, QueueError>;

    /// Loads an existing ticket, keeping the counter above its id
    fn insert(&self, ticket: Ticket) -> Result<(), QueueError>;

    /// Moves a ticket to `status`
    fn set_status(&self, id: TicketId, status: TicketStatus) -> Result<Ticket, QueueError>;

    fn distribution_enabled(&self) -> bool;

    fn set_distribution_enabled(&self, enabled: bool);

    fn next_ticket_counter(&self) -> u64;

    /// Number of tickets in the queue
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue statistics taken from one consistent view of the state
    fn stats(&self) -> QueueStats;

    /// Subscribe to queue events
    fn subscribe(&self) -> broadcast::Receiver<QueueEvent>;
}
