use std::fmt;

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::TicketId;

/// Why a reservation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Ticket distribution is currently stopped
    DistributionStopped,
    /// The client's position is not known yet
    LocationUnknown,
    /// No nearest agency has been resolved yet
    AgencyUnresolved,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::DistributionStopped => "distribution is stopped",
            RejectReason::LocationUnknown => "client location is unknown",
            RejectReason::AgencyUnresolved => "no nearest agency resolved",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Reverse geocoding failed: {0}")]
    GeocodeFailure(String),

    #[error("Agency directory is empty")]
    EmptyAgencyDirectory,

    #[error("Reservation rejected: {0}")]
    ReservationRejected(RejectReason),

    #[error("Ticket {0} already exists")]
    DuplicateTicket(TicketId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request data: {0}")]
    ValidationError(String),

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl QueueError {
    /// Errors the user can clear by retrying the location request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::PermissionDenied | QueueError::LocationUnavailable(_))
    }
}

impl ResponseError for QueueError {
    fn error_response(&self) -> HttpResponse {
        match self {
            QueueError::ValidationError(msg) => HttpResponse::BadRequest().json(json!({
                "error": "validation_error",
                "message": msg
            })),
            QueueError::PermissionDenied => HttpResponse::Forbidden().json(json!({
                "error": "permission_denied",
                "message": self.to_string()
            })),
            QueueError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": msg
            })),
            QueueError::ReservationRejected(reason) => HttpResponse::Conflict().json(json!({
                "error": "reservation_rejected",
                "message": reason.to_string()
            })),
            QueueError::DuplicateTicket(_) => HttpResponse::Conflict().json(json!({
                "error": "duplicate_ticket",
                "message": self.to_string()
            })),
            QueueError::LocationUnavailable(_) | QueueError::GeocodeFailure(_) => {
                HttpResponse::ServiceUnavailable().json(json!({
                    "error": "unavailable",
                    "message": self.to_string()
                }))
            }
            QueueError::EmptyAgencyDirectory
            | QueueError::NotificationFailed(_)
            | QueueError::Internal(_) => {
                log::error!("Internal error: {}", self);
                HttpResponse::InternalServerError().json(json!({
                    "error": "internal_error",
                    "message": "An internal server error occurred"
                }))
            }
        }
    }
}
