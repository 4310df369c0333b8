#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use onea_queue::agency::AgencyDirectory;
use onea_queue::config::QueueConfig;
use onea_queue::error::QueueError;
use onea_queue::external::UNKNOWN_ADDRESS;
use onea_queue::models::TicketId;
use onea_queue::queue::{MemoryQueue, QueueStore};
use onea_queue::service::TicketService;
use onea_queue::session::{ClientSession, SessionHandle, SessionView};

use common::{
    init, near_kossodo, near_pissy, test_service, FailingGeocoder, FailingLocation, FixedLocation,
    RecordingNotifier, ScriptedLocation, StalledLocation,
};

const WAIT: Duration = Duration::from_secs(2);

fn fast_config() -> QueueConfig {
    QueueConfig {
        location_timeout_ms: 50,
        ..QueueConfig::default()
    }
}

async fn settle<F>(handle: &SessionHandle, predicate: F) -> SessionView
where
    F: FnMut(&SessionView) -> bool,
{
    tokio::time::timeout(WAIT, handle.wait_for(predicate))
        .await
        .expect("Timed out waiting for session state")
        .expect("Session stopped")
}

/// Sends a reservation and waits until the session has processed it.
/// Callers settle the location and address first so no other event races it.
async fn reserve(handle: &SessionHandle) -> SessionView {
    let before = handle.view().revision;
    handle.request_reservation().unwrap();
    settle(handle, |view| view.revision > before).await
}

#[tokio::test]
async fn test_session_resolves_location_agency_and_address() {
    init();
    let (service, _store, _notifier) = test_service(1);
    let handle = ClientSession::spawn(service, Arc::new(FixedLocation(near_pissy())), &fast_config());

    let view = settle(&handle, |view| view.address.is_some()).await;

    assert!(!view.locating);
    assert_eq!(view.location, Some(near_pissy()));
    assert_eq!(view.address.as_deref(), Some("Pissy"));
    assert_eq!(view.nearest.unwrap().agency.name, "ONEA Agence Pissy");
    assert!(view.location_error.is_none());
    assert!(view.my_ticket_id.is_none());
}

#[tokio::test]
async fn test_session_geocode_failure_uses_placeholder() {
    init();
    let service = TicketService::new(
        Arc::new(MemoryQueue::default()),
        AgencyDirectory::default(),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FailingGeocoder),
    );
    let handle = ClientSession::spawn(service, Arc::new(FixedLocation(near_pissy())), &fast_config());

    let view = settle(&handle, |view| view.address.is_some()).await;
    assert_eq!(view.address.as_deref(), Some(UNKNOWN_ADDRESS));
    assert!(view.location_error.is_none());
}

#[tokio::test]
async fn test_session_permission_denied_blocks_reservation() {
    init();
    let (service, store, notifier) = test_service(1);
    let handle = ClientSession::spawn(
        service,
        Arc::new(FailingLocation(QueueError::PermissionDenied)),
        &fast_config(),
    );

    let view = settle(&handle, |view| view.location_error.is_some()).await;
    let error = view.location_error.clone().unwrap();
    assert_eq!(error, QueueError::PermissionDenied);
    assert!(error.is_retryable());
    assert!(!view.can_reserve(true));

    let view = reserve(&handle).await;
    assert!(view.my_ticket_id.is_none());
    assert!(store.is_empty());
    assert_eq!(notifier.count(), 0);
    assert!(handle.progress().is_none());
}

#[tokio::test]
async fn test_session_location_timeout() {
    init();
    let (service, _store, _notifier) = test_service(1);
    let handle = ClientSession::spawn(service, Arc::new(StalledLocation), &fast_config());

    let view = settle(&handle, |view| view.location_error.is_some()).await;
    assert!(matches!(view.location_error, Some(QueueError::LocationUnavailable(_))));
    assert!(!view.locating);
    assert!(view.location.is_none());
}

#[tokio::test]
async fn test_session_retry_after_failure() {
    init();
    let (service, _store, _notifier) = test_service(1);
    let provider = ScriptedLocation::new(vec![
        Err(QueueError::LocationUnavailable("GPS off".to_string())),
        Ok(near_kossodo()),
    ]);
    let handle = ClientSession::spawn(service, Arc::new(provider), &fast_config());

    settle(&handle, |view| view.location_error.is_some()).await;

    handle.request_location().unwrap();
    let view = settle(&handle, |view| view.location.is_some()).await;
    assert!(view.location_error.is_none());
    assert_eq!(view.nearest.unwrap().agency.name, "ONEA Agence Kossodo");
}

#[tokio::test]
async fn test_session_reserves_and_tracks_position() {
    init();
    let (service, store, notifier) = test_service(3);
    let handle = ClientSession::spawn(service.clone(), Arc::new(FixedLocation(near_pissy())), &fast_config());
    settle(&handle, |view| view.address.is_some()).await;
    assert!(handle.view().can_reserve(store.distribution_enabled()));

    let view = reserve(&handle).await;
    assert_eq!(view.my_ticket_id, Some(TicketId(3)));
    assert_eq!(notifier.count(), 1);

    let progress = handle.progress().unwrap();
    assert_eq!(progress.ticket.display_number, "A103");
    assert_eq!(progress.position, 1);
    assert_eq!(progress.estimate.clients_ahead, 0);
    assert_eq!(progress.estimate.travel_wait_minutes, 2);

    // A second client joins behind us
    let other = ClientSession::spawn(service, Arc::new(FixedLocation(near_kossodo())), &fast_config());
    settle(&other, |view| view.address.is_some()).await;
    let other_view = reserve(&other).await;
    assert_eq!(other_view.my_ticket_id, Some(TicketId(4)));

    let theirs = other.progress().unwrap();
    assert_eq!(theirs.position, 2);
    assert_eq!(theirs.estimate.queue_wait_minutes, 15);
    assert_eq!(theirs.ticket.agency_name, "ONEA Agence Kossodo");

    assert_eq!(handle.progress().unwrap().position, 1);
}

#[tokio::test]
async fn test_session_reservation_noop_when_distribution_stopped() {
    init();
    let (service, store, notifier) = test_service(1);
    service.set_distribution_enabled(false);
    let handle = ClientSession::spawn(service, Arc::new(FixedLocation(near_pissy())), &fast_config());
    settle(&handle, |view| view.address.is_some()).await;
    assert!(!handle.view().can_reserve(store.distribution_enabled()));

    let view = reserve(&handle).await;
    assert!(view.my_ticket_id.is_none());
    assert!(store.is_empty());
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_stale_geocode_is_ignored() {
    init();
    let (service, _store, _notifier) = test_service(1);
    let handle = ClientSession::spawn(service, Arc::new(FixedLocation(near_pissy())), &fast_config());
    settle(&handle, |view| view.address.is_some()).await;

    let before = handle.view().revision;
    handle
        .send(onea_queue::session::SessionEvent::GeocodeResolved {
            location: near_kossodo(),
            address: "Kossodo".to_string(),
        })
        .unwrap();
    let view = settle(&handle, |view| view.revision > before).await;
    assert_eq!(view.address.as_deref(), Some("Pissy"));
}
