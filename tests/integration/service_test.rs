#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use onea_queue::agency::AgencyDirectory;
use onea_queue::error::{QueueError, RejectReason};
use onea_queue::external::UNKNOWN_ADDRESS;
use onea_queue::models::{TicketId, TicketStatus};
use onea_queue::queue::{MemoryQueue, QueueStore};
use onea_queue::service::{TicketService, RESERVATION_TITLE};

use common::{init, near_kossodo, near_pissy, test_service, FailingGeocoder, RecordingNotifier};

#[tokio::test]
async fn test_reserve_ticket_notifies_after_store() {
    init();
    let (service, store, notifier) = test_service(3);
    let agency = service.directory().nearest(&near_pissy()).unwrap().agency;

    let ticket = service
        .reserve_ticket(Some(near_pissy()), Some(&agency))
        .await
        .expect("reservation should succeed");

    assert_eq!(ticket.id, TicketId(3));
    assert_eq!(ticket.display_number, "A103");
    assert_eq!(ticket.agency_name, "ONEA Agence Pissy");
    assert_eq!(store.len(), 1);

    let sent = notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, RESERVATION_TITLE);
    assert_eq!(
        sent[0].1,
        "Votre ticket A103 a bien été pris pour l'agence ONEA Agence Pissy."
    );
    assert_eq!(*notifier.ticket_visible.lock(), vec![true]);
}

#[tokio::test]
async fn test_reserve_ticket_is_noop_when_distribution_stopped() {
    init();
    let (service, store, notifier) = test_service(1);
    let agency = service.directory().nearest(&near_pissy()).unwrap().agency;
    service.set_distribution_enabled(false);

    let ticket = service.reserve_ticket(Some(near_pissy()), Some(&agency)).await;

    assert!(ticket.is_none());
    assert!(store.is_empty());
    assert_eq!(store.next_ticket_counter(), 1);
    assert_eq!(notifier.count(), 0);

    assert_eq!(
        service.try_reserve(Some(near_pissy()), Some(&agency)).await,
        Err(QueueError::ReservationRejected(RejectReason::DistributionStopped))
    );
}

#[tokio::test]
async fn test_reserve_ticket_requires_location_and_agency() {
    init();
    let (service, store, notifier) = test_service(1);
    let agency = service.directory().nearest(&near_pissy()).unwrap().agency;

    assert!(service.reserve_ticket(None, Some(&agency)).await.is_none());
    assert!(service.reserve_ticket(Some(near_pissy()), None).await.is_none());
    assert!(service.reserve_ticket(None, None).await.is_none());

    assert_eq!(
        service.try_reserve(None, Some(&agency)).await,
        Err(QueueError::ReservationRejected(RejectReason::LocationUnknown))
    );
    assert_eq!(
        service.try_reserve(Some(near_pissy()), None).await,
        Err(QueueError::ReservationRejected(RejectReason::AgencyUnresolved))
    );
    assert!(store.is_empty());
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_notification_failure_does_not_cancel_reservation() {
    init();
    let store = Arc::new(MemoryQueue::new(100, 1, true));
    let notifier = Arc::new(RecordingNotifier::failing());
    let service = TicketService::new(
        store.clone(),
        AgencyDirectory::default(),
        notifier.clone(),
        Arc::new(FailingGeocoder),
    );
    let agency = service.directory().nearest(&near_pissy()).unwrap().agency;

    let ticket = service.reserve_ticket(Some(near_pissy()), Some(&agency)).await;

    assert!(ticket.is_some());
    assert_eq!(store.len(), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_reserve_at_resolves_nearest_agency() {
    init();
    let (service, _store, _notifier) = test_service(1);

    let first = service.reserve_at(near_kossodo()).await.unwrap();
    assert_eq!(first.agency.name, "ONEA Agence Kossodo");
    assert_eq!(first.position, 1);
    assert_eq!(first.estimate.clients_ahead, 0);
    assert_eq!(first.estimate.queue_wait_minutes, 0);

    let second = service.reserve_at(near_pissy()).await.unwrap();
    assert_eq!(second.ticket.display_number, "A102");
    assert_eq!(second.agency.name, "ONEA Agence Pissy");
    assert_eq!(second.position, 2);
    assert_eq!(second.estimate.queue_wait_minutes, 15);
    // ~0.14km away rounds up to two minutes
    assert_eq!(second.estimate.travel_wait_minutes, 2);
}

#[tokio::test]
async fn test_progress_tracks_queue() {
    init();
    let (service, store, _notifier) = test_service(1);
    let first = service.reserve_at(near_pissy()).await.unwrap().ticket;
    let second = service.reserve_at(near_pissy()).await.unwrap().ticket;

    let progress = service.progress(second.id).unwrap();
    assert_eq!(progress.position, 2);
    assert_eq!(progress.estimate.clients_ahead, 1);
    assert_eq!(
        progress.estimate.total_wait_minutes,
        progress.estimate.queue_wait_minutes + progress.estimate.travel_wait_minutes
    );

    store.set_status(first.id, TicketStatus::InProgress).unwrap();
    assert_eq!(service.progress(second.id).unwrap().position, 2);

    assert!(matches!(service.progress(TicketId(42)), Err(QueueError::NotFound(_))));
}

#[tokio::test]
async fn test_progress_unknown_agency() {
    init();
    let (service, store, _notifier) = test_service(1);
    store.insert(common::ticket(5, "Agence fermée")).unwrap();

    assert!(matches!(service.progress(TicketId(5)), Err(QueueError::NotFound(_))));
}

#[tokio::test]
async fn test_locate_uses_geocoder_and_fallback() {
    init();
    let (service, _store, _notifier) = test_service(1);
    let located = service.locate(near_pissy()).await.unwrap();
    assert_eq!(located.address, "Pissy");
    assert_eq!(located.nearest_agency.unwrap().name, "ONEA Agence Pissy");
    assert!(located.distance_km.unwrap() < 0.5);

    let offline = TicketService::new(
        Arc::new(MemoryQueue::default()),
        AgencyDirectory::default(),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FailingGeocoder),
    );
    let located = offline.locate(near_pissy()).await.unwrap();
    assert_eq!(located.address, UNKNOWN_ADDRESS);
}

#[tokio::test]
async fn test_empty_directory_is_reported() {
    init();
    let service = TicketService::new(
        Arc::new(MemoryQueue::default()),
        AgencyDirectory::new(Vec::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FailingGeocoder),
    );

    assert_eq!(
        service.reserve_at(near_pissy()).await.err(),
        Some(QueueError::EmptyAgencyDirectory)
    );
    assert!(service.locate(near_pissy()).await.is_err());
}

#[tokio::test]
async fn test_search_and_stats() {
    init();
    let (service, store, _notifier) = test_service(1);
    for _ in 0..3 {
        service.reserve_at(near_pissy()).await.unwrap();
    }
    store.set_status(TicketId(1), TicketStatus::InProgress).unwrap();

    assert_eq!(service.search(" a102 ").unwrap().id, TicketId(2));
    assert!(service.search("A109").is_none());

    let stats = service.stats();
    assert_eq!(stats.total_tickets, 3);
    assert_eq!(stats.waiting, 2);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.next_ticket_counter, 4);

    let stats = service.set_distribution_enabled(false);
    assert!(!stats.distribution_enabled);
    assert!(service.reserve_at(near_pissy()).await.is_err());

    let health = service.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.queue_stats.total_tickets, 3);
}
