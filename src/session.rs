//! Client session actor.
//!
//! One task owns the session state and applies [`SessionEvent`]s one at a
//! time. Device callbacks (location fix, reverse geocoding) run as spawned
//! tasks that post their outcome back as events, so state is only ever
//! touched by the session loop. Observers read the latest [`SessionView`]
//! through a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::agency::NearestAgency;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::estimator;
use crate::external::{resolve_address, LocationProvider};
use crate::models::{Coordinate, TicketId, TicketProgress};
use crate::queue::QueueStore;
use crate::service::TicketService;

/// Inputs to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Ask the device for a fresh location fix (also the user's retry action)
    LocationRequested,
    /// The device produced a fix
    LocationResolved(Coordinate),
    /// The device refused or failed to produce a fix
    LocationFailed(QueueError),
    /// Reverse geocoding of `location` finished
    GeocodeResolved { location: Coordinate, address: String },
    /// The user asked for a ticket
    ReservationRequested,
}

/// What the session currently knows, as published to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    /// Incremented after every processed event
    pub revision: u64,
    /// A location fix is in flight
    pub locating: bool,
    pub location: Option<Coordinate>,
    /// Display address of `location`; `None` while loading
    pub address: Option<String>,
    pub nearest: Option<NearestAgency>,
    /// Last location failure, cleared by the next successful fix
    pub location_error: Option<QueueError>,
    /// Ticket reserved by this session
    pub my_ticket_id: Option<TicketId>,
}

impl SessionView {
    /// Whether a reservation would currently go through.
    pub fn can_reserve(&self, distribution_enabled: bool) -> bool {
        distribution_enabled
            && self.location_error.is_none()
            && self.location.is_some()
            && self.nearest.is_some()
    }
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::UnboundedSender<SessionEvent>,
    view: watch::Receiver<SessionView>,
    store: Arc<dyn QueueStore>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn send(&self, event: SessionEvent) -> Result<(), QueueError> {
        self.commands
            .send(event)
            .map_err(|_| QueueError::Internal(format!("session {} has stopped", self.id)))
    }

    pub fn request_location(&self) -> Result<(), QueueError> {
        self.send(SessionEvent::LocationRequested)
    }

    pub fn request_reservation(&self) -> Result<(), QueueError> {
        self.send(SessionEvent::ReservationRequested)
    }

    /// Latest published state.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionView, QueueError>
    where
        F: FnMut(&SessionView) -> bool,
    {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_| QueueError::Internal(format!("session {} has stopped", self.id)))?;
        Ok(view.clone())
    }

    /// Position and wait estimate of this session's ticket, recomputed from
    /// the current queue snapshot and the session's distance to its agency.
    pub fn progress(&self) -> Option<TicketProgress> {
        let view = self.view();
        let id = view.my_ticket_id?;
        let snapshot = self.store.snapshot();
        let index = snapshot.iter().position(|ticket| ticket.id == id)?;
        let position = index + 1;
        let distance_km = view.nearest.as_ref().map_or(0.0, |nearest| nearest.distance_km);

        Some(TicketProgress {
            ticket: snapshot[index].clone(),
            position,
            distance_km,
            estimate: estimator::estimate_now(position, distance_km),
        })
    }
}

/// State owner of one client session.
pub struct ClientSession {
    id: Uuid,
    service: TicketService,
    location_provider: Arc<dyn LocationProvider>,
    location_timeout: Duration,
    commands: mpsc::UnboundedReceiver<SessionEvent>,
    internal_tx: mpsc::UnboundedSender<SessionEvent>,
    internal_rx: mpsc::UnboundedReceiver<SessionEvent>,
    view_tx: watch::Sender<SessionView>,
    view: SessionView,
}

impl ClientSession {
    /// Starts a session on the current tokio runtime and immediately requests
    /// a location fix. The session stops once every handle is dropped.
    pub fn spawn(
        service: TicketService,
        location_provider: Arc<dyn LocationProvider>,
        config: &QueueConfig,
    ) -> SessionHandle {
        let id = Uuid::new_v4();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(SessionView::default());
        let store = service.store().clone();

        let session = ClientSession {
            id,
            service,
            location_provider,
            location_timeout: config.location_timeout(),
            commands: commands_rx,
            internal_tx,
            internal_rx,
            view_tx,
            view: SessionView::default(),
        };

        log::info!("Starting client session {}", id);
        tokio::spawn(session.run());

        SessionHandle {
            id,
            commands: commands_tx,
            view: view_rx,
            store,
        }
    }

    async fn run(mut self) {
        self.handle(SessionEvent::LocationRequested).await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                Some(event) = self.internal_rx.recv() => self.handle(event).await,
            }
        }

        log::info!("Client session {} stopped", self.id);
    }

    async fn handle(&mut self, event: SessionEvent) {
        log::debug!("Session {} handling {:?}", self.id, event);

        match event {
            SessionEvent::LocationRequested => self.request_location(),
            SessionEvent::LocationResolved(location) => self.location_resolved(location),
            SessionEvent::LocationFailed(error) => {
                log::warn!("Session {} location failed: {}", self.id, error);
                self.view.locating = false;
                self.view.location_error = Some(error);
            }
            SessionEvent::GeocodeResolved { location, address } => {
                if self.view.location == Some(location) {
                    self.view.address = Some(address);
                } else {
                    log::debug!("Session {} dropping address for stale location ({})", self.id, location);
                }
            }
            SessionEvent::ReservationRequested => self.reserve().await,
        }

        self.view.revision += 1;
        self.view_tx.send_replace(self.view.clone());
    }

    fn request_location(&mut self) {
        self.view.locating = true;

        let provider = self.location_provider.clone();
        let tx = self.internal_tx.clone();
        let timeout = self.location_timeout;

        tokio::spawn(async move {
            let event = match tokio::time::timeout(timeout, provider.current_location()).await {
                Ok(Ok(location)) => SessionEvent::LocationResolved(location),
                Ok(Err(error)) => SessionEvent::LocationFailed(error),
                Err(_) => SessionEvent::LocationFailed(QueueError::LocationUnavailable(format!(
                    "no location fix within {}ms",
                    timeout.as_millis()
                ))),
            };
            let _ = tx.send(event);
        });
    }

    fn location_resolved(&mut self, location: Coordinate) {
        self.view.locating = false;
        self.view.location = Some(location);
        self.view.location_error = None;
        self.view.address = None;
        self.view.nearest = self.service.directory().nearest(&location).ok();

        let geocoder = self.service.geocoder();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let address = resolve_address(geocoder.as_ref(), &location).await;
            let _ = tx.send(SessionEvent::GeocodeResolved { location, address });
        });
    }

    async fn reserve(&mut self) {
        if let Some(error) = &self.view.location_error {
            log::info!("Session {} cannot reserve while location is failing: {}", self.id, error);
            return;
        }

        let agency = self.view.nearest.as_ref().map(|nearest| &nearest.agency);
        if let Some(ticket) = self.service.reserve_ticket(self.view.location, agency).await {
            log::info!("Session {} holds ticket {}", self.id, ticket.display_number);
            self.view.my_ticket_id = Some(ticket.id);
        }
    }
}
