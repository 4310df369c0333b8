//! Queue position and wait-time estimation.
//!
//! Everything here is a pure function of a queue snapshot and a distance;
//! nothing is cached, callers recompute on every read.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::models::{QueueStats, Ticket, TicketStatus};

/// Service time assumed for each ticket ahead, in minutes
pub const SERVICE_MINUTES_PER_TICKET: u32 = 15;

/// Travel time assumed per kilometer, in minutes
pub const TRAVEL_MINUTES_PER_KM: f64 = 10.0;

/// Estimated wait for a client holding a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitEstimate {
    pub clients_ahead: u32,
    pub queue_wait_minutes: u32,
    pub travel_wait_minutes: u32,
    pub total_wait_minutes: u32,
    /// Local wall-clock time the client should be served, as `HH:MM`
    pub estimated_arrival: String,
}

/// Estimates the wait for the ticket at 1-based `position` when the client is
/// `distance_km` away from the agency, relative to `now`.
///
/// A position of 0 is treated as 1. A NaN or negative distance adds no travel time.
pub fn estimate(position: usize, distance_km: f64, now: OffsetDateTime) -> WaitEstimate {
    let clients_ahead = u32::try_from(position.saturating_sub(1)).unwrap_or(u32::MAX);
    let queue_wait_minutes = clients_ahead.saturating_mul(SERVICE_MINUTES_PER_TICKET);
    // `as` saturates and maps NaN to 0
    let travel_wait_minutes = (distance_km * TRAVEL_MINUTES_PER_KM).ceil() as u32;
    let total_wait_minutes = queue_wait_minutes.saturating_add(travel_wait_minutes);

    WaitEstimate {
        clients_ahead,
        queue_wait_minutes,
        travel_wait_minutes,
        total_wait_minutes,
        estimated_arrival: arrival_clock_time(now, total_wait_minutes),
    }
}

/// Same as [`estimate`] using the current local time.
pub fn estimate_now(position: usize, distance_km: f64) -> WaitEstimate {
    estimate(position, distance_km, local_now())
}

/// Shown when the arrival time cannot be computed.
pub const UNKNOWN_ARRIVAL: &str = "--:--";

/// `now + minutes` formatted as `HH:MM`, or [`UNKNOWN_ARRIVAL`] when the
/// arrival falls outside the representable date range.
pub fn arrival_clock_time(now: OffsetDateTime, minutes: u32) -> String {
    let arrival = match now.checked_add(Duration::minutes(i64::from(minutes))) {
        Some(arrival) => arrival,
        None => {
            log::warn!("Arrival {} minutes after {} is out of range", minutes, now);
            return UNKNOWN_ARRIVAL.to_string();
        }
    };
    arrival
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|e| {
            log::warn!("Failed to format arrival time: {}", e);
            UNKNOWN_ARRIVAL.to_string()
        })
}

/// Current time in the local offset, UTC when the offset cannot be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Aggregates over a snapshot sorted ascending by id.
pub fn queue_stats(snapshot: &[Ticket], distribution_enabled: bool, next_ticket_counter: u64) -> QueueStats {
    let mut waiting = 0usize;
    let mut in_progress = 0usize;
    let mut waiting_minutes = 0u64;

    for (index, ticket) in snapshot.iter().enumerate() {
        match ticket.status {
            TicketStatus::Waiting => {
                waiting += 1;
                waiting_minutes += index as u64 * u64::from(SERVICE_MINUTES_PER_TICKET);
            }
            TicketStatus::InProgress => in_progress += 1,
        }
    }

    let average_queue_wait_minutes = if waiting > 0 {
        waiting_minutes as f64 / waiting as f64
    } else {
        0.0
    };

    QueueStats {
        total_tickets: snapshot.len(),
        waiting,
        in_progress,
        average_queue_wait_minutes,
        distribution_enabled,
        next_ticket_counter,
    }
}
