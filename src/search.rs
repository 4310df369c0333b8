//! Ticket lookup by display number.

use crate::models::Ticket;

/// True when `query`, trimmed, equals `display_number` ignoring case.
pub fn matches_display_number(display_number: &str, query: &str) -> bool {
    display_number.to_lowercase() == query.trim().to_lowercase()
}

/// Finds the ticket whose display number matches `query` in a caller-held snapshot.
/// Pure over `snapshot`; never reads the store.
pub fn search<'a>(query: &str, snapshot: &'a [Ticket]) -> Option<&'a Ticket> {
    if query.trim().is_empty() {
        return None;
    }
    snapshot
        .iter()
        .find(|ticket| matches_display_number(&ticket.display_number, query))
}
