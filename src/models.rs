//! Data models for the queue service.
//! Defines the tickets, agencies and coordinates the engine works on, plus
//! the request/response bodies of the HTTP surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::estimator::WaitEstimate;

/// Geographic position in degrees.
/// Ranges are not validated; out-of-range values flow through the math as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to `other` in kilometers.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        crate::geo::distance_km(self, other)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// A service agency clients can queue at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub name: String,
    /// Neighbourhood the agency sits in
    pub district: String,
    pub location: Coordinate,
}

impl Agency {
    pub fn new(name: &str, district: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            district: district.to_string(),
            location: Coordinate::new(latitude, longitude),
        }
    }
}

/// Numeric ticket identifier. Travels as a decimal string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TicketId(pub u64);

impl TicketId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TicketId)
            .map_err(|_| format!("ticket id must be numeric, got {:?}", s))
    }
}

impl From<TicketId> for String {
    fn from(id: TicketId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TicketId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where a ticket is in the service workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Still waiting to be called
    Waiting,
    /// Called by an agent and being served
    InProgress,
}

/// A client's place in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    /// Number shown to the client, always `"A10"` followed by the id
    pub display_number: String,
    pub status: TicketStatus,
    /// Where the client was when the ticket was taken
    pub client_location: Coordinate,
    pub agency_name: String,
}

impl Ticket {
    /// Builds a fresh waiting ticket with its display number derived from `id`.
    pub fn new(id: TicketId, client_location: Coordinate, agency_name: &str) -> Self {
        Self {
            id,
            display_number: display_number(id),
            status: TicketStatus::Waiting,
            client_location,
            agency_name: agency_name.to_string(),
        }
    }
}

/// Display number for a ticket id: `3` becomes `A103`.
pub fn display_number(id: TicketId) -> String {
    format!("A10{}", id)
}

/// Body of a reservation made over HTTP.
pub type ReserveRequest = Coordinate;

/// Result of a successful reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub ticket: Ticket,
    pub agency: Agency,
    pub distance_km: f64,
    pub position: usize,
    pub estimate: WaitEstimate,
}

/// Live position and wait estimate of one ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketProgress {
    pub ticket: Ticket,
    /// 1-based rank in the ascending-by-id queue
    pub position: usize,
    pub distance_km: f64,
    pub estimate: WaitEstimate,
}

/// What the engine knows about a client's position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateResponse {
    pub location: Coordinate,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_agency: Option<Agency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Query string of the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub number: String,
}

/// Body of the distribution toggle endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub enabled: bool,
}

/// Aggregate figures over the current queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_tickets: usize,
    pub waiting: usize,
    pub in_progress: usize,
    /// Mean queue wait of the waiting tickets, in minutes
    pub average_queue_wait_minutes: f64,
    pub distribution_enabled: bool,
    pub next_ticket_counter: u64,
}

/// Health information returned by the health endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub queue_stats: QueueStats,
}
