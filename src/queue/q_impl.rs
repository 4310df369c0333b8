use tokio::sync::broadcast;
use crate::error::{QueueError, RejectReason};
use crate::estimator;
use crate::models::{Coordinate, QueueStats, Ticket, TicketId, TicketStatus};
use crate::queue::types::*;
use crate::queue::q_core::MemoryQueue;
use crate::search::matches_display_number;

impl QueueStore for MemoryQueue {
    fn snapshot(&self) -> Vec<Ticket> {
        self.state.read().sorted()
    }

    fn get(&self, id: TicketId) -> Option<Ticket> {
        self.state
            .read()
            .tickets
            .iter()
            .find(|ticket| ticket.id == id)
            .cloned()
    }

    fn find_by_display_number(&self, number: &str) -> Option<Ticket> {
        if number.trim().is_empty() {
            return None;
        }
        let state = self.state.read();
        // Lowest id wins if two tickets ever shared a display number
        state
            .tickets
            .iter()
            .filter(|ticket| matches_display_number(&ticket.display_number, number))
            .min_by_key(|ticket| ticket.id)
            .cloned()
    }

    fn position_of(&self, id: TicketId) -> Option<usize> {
        self.state.read().position_of(id)
    }

    /// Issues the next ticket while holding the write lock for the whole
    /// check-allocate-append-increment sequence.
    fn reserve(&self, client_location: Coordinate, agency_name: &str) -> Result<Ticket, QueueError> {
        let ticket = {
            let mut state = self.state.write();
            if !state.distribution_enabled {
                log::info!("Reservation for {} refused: distribution stopped", agency_name);
                return Err(QueueError::ReservationRejected(RejectReason::DistributionStopped));
            }

            let id = TicketId(state.next_ticket_counter);
            let next_counter = state.next_ticket_counter.checked_add(1).ok_or_else(|| {
                log::error!("Ticket counter exhausted at {}", id);
                QueueError::Internal("ticket ids exhausted".to_string())
            })?;
            let ticket = Ticket::new(id, client_location, agency_name);
            state.tickets.push(ticket.clone());
            state.next_ticket_counter = next_counter;
            ticket
        };

        log::info!(
            "Reserved ticket {} (id {}) at {}",
            ticket.display_number,
            ticket.id,
            ticket.agency_name
        );
        self.emit(QueueEvent::Reserved(ticket.clone()));
        Ok(ticket)
    }

    fn insert(&self, ticket: Ticket) -> Result<(), QueueError> {
        {
            let mut state = self.state.write();
            if state.contains(ticket.id) {
                log::warn!("Refusing to insert duplicate ticket {}", ticket.id);
                return Err(QueueError::DuplicateTicket(ticket.id));
            }
            let floor = ticket.id.value().checked_add(1).ok_or_else(|| {
                QueueError::ValidationError(format!("ticket id {} leaves no room for the counter", ticket.id))
            })?;
            state.next_ticket_counter = state.next_ticket_counter.max(floor);
            state.tickets.push(ticket.clone());
        }

        log::debug!("Inserted ticket {} (id {})", ticket.display_number, ticket.id);
        self.emit(QueueEvent::Inserted(ticket));
        Ok(())
    }

    fn set_status(&self, id: TicketId, status: TicketStatus) -> Result<Ticket, QueueError> {
        let updated = {
            let mut state = self.state.write();
            let ticket = state
                .tickets
                .iter_mut()
                .find(|ticket| ticket.id == id)
                .ok_or_else(|| QueueError::NotFound(format!("ticket {}", id)))?;
            ticket.status = status;
            ticket.clone()
        };

        log::info!("Ticket {} is now {:?}", updated.display_number, status);
        self.emit(QueueEvent::StatusChanged(updated.clone()));
        Ok(updated)
    }

    fn distribution_enabled(&self) -> bool {
        self.state.read().distribution_enabled
    }

    fn set_distribution_enabled(&self, enabled: bool) {
        let changed = {
            let mut state = self.state.write();
            let changed = state.distribution_enabled != enabled;
            state.distribution_enabled = enabled;
            changed
        };

        if changed {
            log::info!("Ticket distribution {}", if enabled { "resumed" } else { "stopped" });
            self.emit(QueueEvent::DistributionChanged(enabled));
        }
    }

    fn next_ticket_counter(&self) -> u64 {
        self.state.read().next_ticket_counter
    }

    fn len(&self) -> usize {
        self.state.read().tickets.len()
    }

    /// Aggregates computed under one read lock, so counts and counter agree.
    fn stats(&self) -> QueueStats {
        let state = self.state.read();
        estimator::queue_stats(
            &state.sorted(),
            state.distribution_enabled,
            state.next_ticket_counter,
        )
    }

    fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }
}
