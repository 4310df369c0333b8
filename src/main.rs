//! Main entry point for the queue service.
//! Sets up the HTTP server, configures logging, and initializes the ticket
//! service with environment-based configuration.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};

use onea_queue::agency::AgencyDirectory;
use onea_queue::api;
use onea_queue::config::QueueConfig;
use onea_queue::external::{LogNotifier, NominatimGeocoder};
use onea_queue::queue::MemoryQueue;
use onea_queue::service::TicketService;

/// Main entry point for the queue service.
///
/// # Environment Variables
/// - PORT: HTTP port (default: 8080)
/// - ONEA_*: see `config` for the engine settings
/// - RUST_LOG: log level for env_logger
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = QueueConfig::from_env_or_default();
    log::info!("Starting queue service with configuration: {:?}", config);

    let geocoder = NominatimGeocoder::new(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let service = web::Data::new(TicketService::new(
        Arc::new(MemoryQueue::from_config(&config)),
        AgencyDirectory::default(),
        Arc::new(LogNotifier),
        Arc::new(geocoder),
    ));

    let port = match std::env::var("PORT") {
        Ok(value) => value.parse::<u16>().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("PORT must be a valid port number, got {:?}", value),
            )
        })?,
        Err(_) => 8080,
    };

    log::info!("Starting server on port {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone()) // Share service state across workers
            .configure(api::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
