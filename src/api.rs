//! API endpoints for the queue service.
//! Exposes agency lookup, ticket reservation, queue inspection and the
//! distribution switch. All bodies are JSON.

use actix_web::{get, post, put, web, HttpResponse, Responder, ResponseError};
use crate::error::QueueError;
use crate::models::{Coordinate, DistributionRequest, ReserveRequest, SearchQuery, TicketId};
use crate::service::TicketService;

/// Registers every `/queue` endpoint on a service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/queue")
            .service(health)
            .service(agencies)
            .service(locate)
            .service(tickets)
            .service(reserve)
            .service(search)
            .service(progress)
            .service(stats)
            .service(distribution),
    )
    .service(root_health);
}

/// Health check endpoint under `/queue`.
#[get("/health")]
pub async fn health(service: web::Data<TicketService>) -> impl Responder {
    HttpResponse::Ok().json(service.health())
}

/// Root-level health check for platform probes.
#[get("/health")]
pub async fn root_health(service: web::Data<TicketService>) -> impl Responder {
    HttpResponse::Ok().json(service.health())
}

/// Lists the agency directory.
#[get("/agencies")]
pub async fn agencies(service: web::Data<TicketService>) -> impl Responder {
    HttpResponse::Ok().json(service.directory().agencies())
}

/// Resolves the nearest agency and display address for a position.
///
/// # Returns
/// - 200 OK with the nearest agency, distance and address
/// - 500 Internal Server Error if the directory is empty
#[get("/locate")]
pub async fn locate(
    query: web::Query<Coordinate>,
    service: web::Data<TicketService>,
) -> impl Responder {
    match service.locate(query.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Current queue sorted ascending by ticket id.
#[get("/tickets")]
pub async fn tickets(service: web::Data<TicketService>) -> impl Responder {
    HttpResponse::Ok().json(service.store().snapshot())
}

/// Reserves a ticket at the agency nearest to the posted position.
///
/// # Returns
/// - 200 OK with the ticket, agency, position and wait estimate
/// - 409 Conflict if distribution is stopped
#[post("/tickets")]
pub async fn reserve(
    request: web::Json<ReserveRequest>,
    service: web::Data<TicketService>,
) -> impl Responder {
    match service.reserve_at(request.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Finds a ticket by display number, ignoring case and surrounding spaces.
#[get("/tickets/search")]
pub async fn search(
    query: web::Query<SearchQuery>,
    service: web::Data<TicketService>,
) -> impl Responder {
    match service.search(&query.number) {
        Some(ticket) => HttpResponse::Ok().json(ticket),
        None => QueueError::NotFound(format!("ticket {}", query.number.trim())).error_response(),
    }
}

/// Position and wait estimate of one ticket.
#[get("/tickets/{id}/progress")]
pub async fn progress(
    path: web::Path<String>,
    service: web::Data<TicketService>,
) -> impl Responder {
    let id = match path.parse::<TicketId>() {
        Ok(id) => id,
        Err(msg) => return QueueError::ValidationError(msg).error_response(),
    };
    match service.progress(id) {
        Ok(progress) => HttpResponse::Ok().json(progress),
        Err(e) => e.error_response(),
    }
}

#[get("/stats")]
pub async fn stats(service: web::Data<TicketService>) -> impl Responder {
    HttpResponse::Ok().json(service.stats())
}

/// Opens or closes ticket distribution.
#[put("/distribution")]
pub async fn distribution(
    request: web::Json<DistributionRequest>,
    service: web::Data<TicketService>,
) -> impl Responder {
    HttpResponse::Ok().json(service.set_distribution_enabled(request.enabled))
}
