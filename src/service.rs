use std::sync::Arc;
use std::time::Instant;
use crate::agency::AgencyDirectory;
use crate::error::{QueueError, RejectReason};
use crate::estimator;
use crate::external::{resolve_address, NotificationSink, ReverseGeocoder};
use crate::models::{
    Agency, Coordinate, HealthStatus, LocateResponse, QueueStats, ReservationResponse, Ticket,
    TicketId, TicketProgress,
};
use crate::queue::QueueStore;
use crate::search;

/// Title of the notification sent after a reservation
pub const RESERVATION_TITLE: &str = "Ticket réservé !";

/// Body of the notification sent after a reservation.
pub fn reservation_message(ticket: &Ticket) -> String {
    format!(
        "Votre ticket {} a bien été pris pour l'agence {}.",
        ticket.display_number, ticket.agency_name
    )
}

/// Service that orchestrates reservations on top of the shared queue store.
/// Cheap to clone; every clone works on the same store.
#[derive(Clone)]
pub struct TicketService {
    /// Shared queue, the source of truth for tickets
    store: Arc<dyn QueueStore>,
    /// Static agency catalog
    directory: Arc<AgencyDirectory>,
    /// Where reservation notifications go
    notifier: Arc<dyn NotificationSink>,
    /// Resolves display addresses for client positions
    geocoder: Arc<dyn ReverseGeocoder>,
    /// Service start time for calculating uptime
    start_time: Arc<Instant>,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        directory: AgencyDirectory,
        notifier: Arc<dyn NotificationSink>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        if directory.is_empty() {
            log::error!("TicketService created with an empty agency directory");
        }
        Self {
            store,
            directory: Arc::new(directory),
            notifier,
            geocoder,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn directory(&self) -> &AgencyDirectory {
        &self.directory
    }

    pub fn geocoder(&self) -> Arc<dyn ReverseGeocoder> {
        self.geocoder.clone()
    }

    /// Reserves a ticket for a client whose position and nearest agency are known.
    ///
    /// Every precondition failure (distribution stopped, unknown location,
    /// unresolved agency) is a silent no-op returning `None`: no ticket is
    /// created and nothing is notified. On success the ticket is already in
    /// the store when the notification goes out.
    pub async fn reserve_ticket(
        &self,
        client_location: Option<Coordinate>,
        nearest_agency: Option<&Agency>,
    ) -> Option<Ticket> {
        match self.try_reserve(client_location, nearest_agency).await {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                log::debug!("Reservation skipped: {}", e);
                None
            }
        }
    }

    /// Like [`reserve_ticket`](Self::reserve_ticket) but reports why nothing happened.
    pub async fn try_reserve(
        &self,
        client_location: Option<Coordinate>,
        nearest_agency: Option<&Agency>,
    ) -> Result<Ticket, QueueError> {
        if !self.store.distribution_enabled() {
            return Err(QueueError::ReservationRejected(RejectReason::DistributionStopped));
        }
        let location = client_location
            .ok_or(QueueError::ReservationRejected(RejectReason::LocationUnknown))?;
        let agency = nearest_agency
            .ok_or(QueueError::ReservationRejected(RejectReason::AgencyUnresolved))?;

        // The store re-checks distribution under its write lock
        let ticket = self.store.reserve(location, &agency.name)?;

        if let Err(e) = self
            .notifier
            .notify(RESERVATION_TITLE, &reservation_message(&ticket))
            .await
        {
            log::warn!("Notification for ticket {} failed: {}", ticket.display_number, e);
        }

        Ok(ticket)
    }

    /// Resolves the nearest agency for `point` and reserves a ticket there.
    pub async fn reserve_at(&self, point: Coordinate) -> Result<ReservationResponse, QueueError> {
        let nearest = self.directory.nearest(&point)?;
        let ticket = self.try_reserve(Some(point), Some(&nearest.agency)).await?;
        let position = self.store.position_of(ticket.id).ok_or_else(|| {
            QueueError::Internal(format!("ticket {} vanished after reservation", ticket.id))
        })?;

        Ok(ReservationResponse {
            estimate: estimator::estimate_now(position, nearest.distance_km),
            ticket,
            agency: nearest.agency,
            distance_km: nearest.distance_km,
            position,
        })
    }

    /// Current position and wait estimate of ticket `id`, measured from the
    /// client location recorded on the ticket to its agency.
    pub fn progress(&self, id: TicketId) -> Result<TicketProgress, QueueError> {
        let ticket = self
            .store
            .get(id)
            .ok_or_else(|| QueueError::NotFound(format!("ticket {}", id)))?;
        let position = self
            .store
            .position_of(id)
            .ok_or_else(|| QueueError::NotFound(format!("ticket {}", id)))?;
        let agency = self
            .directory
            .find_by_name(&ticket.agency_name)
            .ok_or_else(|| QueueError::NotFound(format!("agency {}", ticket.agency_name)))?;
        let distance_km = ticket.client_location.distance_km(&agency.location);

        Ok(TicketProgress {
            estimate: estimator::estimate_now(position, distance_km),
            ticket,
            position,
            distance_km,
        })
    }

    /// Nearest agency and display address for `point`.
    pub async fn locate(&self, point: Coordinate) -> Result<LocateResponse, QueueError> {
        let nearest = self.directory.nearest(&point)?;
        let address = resolve_address(self.geocoder.as_ref(), &point).await;

        Ok(LocateResponse {
            location: point,
            address,
            nearest_agency: Some(nearest.agency),
            distance_km: Some(nearest.distance_km),
        })
    }

    /// Looks a ticket up by display number in a fresh snapshot.
    pub fn search(&self, query: &str) -> Option<Ticket> {
        let snapshot = self.store.snapshot();
        search::search(query, &snapshot).cloned()
    }

    pub fn stats(&self) -> QueueStats {
        self.store.stats()
    }

    /// Opens or closes ticket distribution and returns the resulting stats.
    pub fn set_distribution_enabled(&self, enabled: bool) -> QueueStats {
        self.store.set_distribution_enabled(enabled);
        self.stats()
    }

    /// Get health status information for the service
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            queue_stats: self.stats(),
        }
    }
}
