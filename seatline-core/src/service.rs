use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, instrument};

use crate::reservation::{ReservationRequest, ReservationSummary};
use crate::retry::RetryPolicy;
use crate::workflow::ReservationWorkflow;
use crate::{ReservationError, StoreError};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Entry point for booking seats: validation, conflict retries and an overall deadline
/// around [`ReservationWorkflow`].
#[derive(Clone)]
pub struct ReservationService {
    workflow: ReservationWorkflow,
    retry: RetryPolicy,
    deadline: Duration,
}

impl ReservationService {
    pub fn new(workflow: ReservationWorkflow) -> Self {
        Self {
            workflow,
            retry: RetryPolicy::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[instrument(skip(self, request), fields(flight_id = %request.flight_id, seats = request.seats))]
    pub async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<ReservationSummary, ReservationError> {
        request.validate()?;

        // Each attempt runs on its own task. The deadline only abandons the
        // wait; an attempt past its flight write still records, evicts and audits.
        let workflow = self.workflow.clone();
        let attempts = self.retry.run(move |attempt| {
            let workflow = workflow.clone();
            let request = request.clone();
            async move {
                tokio::spawn(async move { workflow.attempt(&request, attempt).await })
                    .await
                    .map_err(|e| ReservationError::Unexpected(StoreError::backend(e)))?
            }
        });

        match timeout(self.deadline, attempts).await {
            Ok(result) => result,
            Err(_) => {
                error!(deadline_ms = self.deadline.as_millis() as u64, "Reservation deadline exceeded");
                Err(ReservationError::DeadlineExceeded(self.deadline))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLogEntry, AuditPipeline};
    use crate::cache::{AvailabilityCache, AvailabilityReader};
    use crate::flight::{fixtures, Flight};
    use crate::memory::{
        InMemoryAuditStore, InMemoryAvailabilityCache, InMemoryFlightStore,
        InMemoryReservationStore,
    };
    use crate::repository::{FlightStore, WriteOutcome};
    use crate::reservation::Passenger;
    use crate::search::FlightSearch;
    use crate::StoreError;
    use async_trait::async_trait;
    use seatline_shared::models::events::{AttemptStatus, FailureKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    fn passenger(n: usize) -> Passenger {
        Passenger {
            name: format!("Passenger{}", n),
            surname: "Test".into(),
            email: format!("p{}@example.com", n),
        }
    }

    struct Setup {
        flights: Arc<InMemoryFlightStore>,
        reservations: Arc<InMemoryReservationStore>,
        cache: Arc<InMemoryAvailabilityCache>,
        audit: Arc<InMemoryAuditStore>,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                flights: Arc::new(InMemoryFlightStore::new()),
                reservations: Arc::new(InMemoryReservationStore::new()),
                cache: Arc::new(InMemoryAvailabilityCache::new()),
                audit: Arc::new(InMemoryAuditStore::new()),
            }
        }

        fn service(
            &self,
            flights: Arc<dyn FlightStore>,
            retry: RetryPolicy,
        ) -> (ReservationService, crate::audit::AuditWorker) {
            let (pipeline, worker) = AuditPipeline::spawn(self.audit.clone(), 256);
            let workflow = ReservationWorkflow::new(
                flights,
                self.reservations.clone(),
                self.cache.clone(),
                pipeline,
            );
            (ReservationService::new(workflow).with_retry_policy(retry), worker)
        }

        async fn audit_for(&self, flight_id: Uuid) -> Vec<AuditLogEntry> {
            self.audit.for_flight(flight_id).await
        }
    }

    /// Commits a rival booking between load and write for the first `races` loads.
    struct RacingFlights {
        inner: Arc<InMemoryFlightStore>,
        races: AtomicUsize,
        rival_seats: i32,
    }

    #[async_trait]
    impl FlightStore for RacingFlights {
        async fn load(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
            let snapshot = self.inner.load(id).await?;
            let remaining = self.races.load(Ordering::SeqCst);
            if let (Some(flight), true) = (&snapshot, remaining > 0) {
                self.races.store(remaining - 1, Ordering::SeqCst);
                let mut rival = flight.clone();
                if rival.reserve(self.rival_seats).is_ok() {
                    self.inner.conditional_save(&rival, flight.version()).await?;
                }
            }
            Ok(snapshot)
        }
        async fn conditional_save(&self, f: &Flight, v: i64) -> Result<WriteOutcome, StoreError> {
            self.inner.conditional_save(f, v).await
        }
        async fn save_all(&self, f: Vec<Flight>) -> Result<Vec<Flight>, StoreError> {
            self.inner.save_all(f).await
        }
        async fn search(&self, c: &FlightSearch) -> Result<Vec<Flight>, StoreError> {
            self.inner.search(c).await
        }
    }

    /// Never lets a write through.
    struct AlwaysConflicting {
        inner: Arc<InMemoryFlightStore>,
    }

    #[async_trait]
    impl FlightStore for AlwaysConflicting {
        async fn load(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
            self.inner.load(id).await
        }
        async fn conditional_save(&self, _f: &Flight, _v: i64) -> Result<WriteOutcome, StoreError> {
            Ok(WriteOutcome::VersionMismatch)
        }
        async fn save_all(&self, f: Vec<Flight>) -> Result<Vec<Flight>, StoreError> {
            self.inner.save_all(f).await
        }
        async fn search(&self, c: &FlightSearch) -> Result<Vec<Flight>, StoreError> {
            self.inner.search(c).await
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(5), 2)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_never_overbook() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(9)).await.id;
        let (service, worker) = setup.service(setup.flights.clone(), RetryPolicy::default());

        let mut handles = Vec::new();
        for n in 0..5 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_reservation(ReservationRequest::new(flight_id, passenger(n), 3))
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ReservationError::Conflict(_)) => {}
                Err(ReservationError::InsufficientSeats { available, requested }) => {
                    assert_eq!((available, requested), (0, 3));
                }
                Err(other) => panic!("unexpected failure: {:?}", other),
            }
        }

        assert_eq!(successes, 3);
        let stored = setup.flights.load(flight_id).await.unwrap().unwrap();
        assert_eq!(stored.reserved_seats(), 9);
        assert_eq!(stored.available_seats(), 0);
        assert_eq!(setup.reservations.for_flight(flight_id).await.len(), 3);

        drop(service);
        worker.join().await;
        let entries = setup.audit_for(flight_id).await;
        let audited_successes = entries
            .iter()
            .filter(|e| e.status == AttemptStatus::Success)
            .count();
        assert_eq!(audited_successes, 3);
        assert!(entries.len() >= 5);
    }

    #[tokio::test]
    async fn test_retry_after_conflict_books_exactly_once() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(10)).await.id;
        let racing = Arc::new(RacingFlights {
            inner: setup.flights.clone(),
            races: AtomicUsize::new(1),
            rival_seats: 1,
        });
        let (service, worker) = setup.service(racing, fast_retry());

        let summary = service
            .create_reservation(ReservationRequest::new(flight_id, passenger(1), 2))
            .await
            .unwrap();
        assert_eq!(summary.seats, 2);

        // Rival's 1 seat plus ours, each counted once.
        let stored = setup.flights.load(flight_id).await.unwrap().unwrap();
        assert_eq!(stored.reserved_seats(), 3);
        assert_eq!(setup.reservations.for_flight(flight_id).await.len(), 1);

        drop(service);
        worker.join().await;
        let entries = setup.audit_for(flight_id).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].failure_kind, Some(FailureKind::Conflict));
        assert_eq!(entries[1].status, AttemptStatus::Success);
    }

    #[tokio::test]
    async fn test_conflict_then_insufficient_seats_is_terminal() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(4)).await.id;
        let racing = Arc::new(RacingFlights {
            inner: setup.flights.clone(),
            races: AtomicUsize::new(1),
            rival_seats: 3,
        });
        let (service, worker) = setup.service(racing, fast_retry());

        let result = service
            .create_reservation(ReservationRequest::new(flight_id, passenger(1), 2))
            .await;

        assert!(matches!(
            result,
            Err(ReservationError::InsufficientSeats { available: 1, requested: 2 })
        ));

        drop(service);
        worker.join().await;
        let kinds: Vec<_> = setup
            .audit_for(flight_id)
            .await
            .iter()
            .map(|e| e.failure_kind)
            .collect();
        assert_eq!(
            kinds,
            vec![Some(FailureKind::Conflict), Some(FailureKind::InsufficientSeats)]
        );
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_three_attempts() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(10)).await.id;
        let store = Arc::new(AlwaysConflicting {
            inner: setup.flights.clone(),
        });
        let (service, worker) = setup.service(store, fast_retry());

        let result = service
            .create_reservation(ReservationRequest::new(flight_id, passenger(1), 1))
            .await;
        assert!(matches!(result, Err(ReservationError::Conflict(id)) if id == flight_id));

        drop(service);
        worker.join().await;
        let entries = setup.audit_for(flight_id).await;
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e.failure_kind == Some(FailureKind::Conflict)));
        let stored = setup.flights.load(flight_id).await.unwrap().unwrap();
        assert_eq!(stored.reserved_seats(), 0);
    }

    #[tokio::test]
    async fn test_unknown_flight_fails_once() {
        let setup = Setup::new();
        let (service, worker) = setup.service(setup.flights.clone(), fast_retry());
        let unknown = Uuid::new_v4();

        let result = service
            .create_reservation(ReservationRequest::new(unknown, passenger(1), 1))
            .await;
        assert!(matches!(result, Err(ReservationError::FlightNotFound(id)) if id == unknown));

        drop(service);
        worker.join().await;
        let entries = setup.audit_for(unknown).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].available_before, None);
        assert_eq!(entries[0].reservation_id, None);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_any_attempt() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(10)).await.id;
        let (service, worker) = setup.service(setup.flights.clone(), fast_retry());

        let result = service
            .create_reservation(ReservationRequest::new(flight_id, passenger(1), 0))
            .await;
        assert!(matches!(result, Err(ReservationError::InvalidRequest(_))));

        drop(service);
        worker.join().await;
        assert!(setup.audit_for(flight_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_availability_is_fresh_after_booking() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(10)).await.id;
        let reader = AvailabilityReader::new(setup.flights.clone(), setup.cache.clone());
        let (service, _worker) = setup.service(setup.flights.clone(), fast_retry());

        assert_eq!(reader.available_seats(flight_id).await.unwrap(), 10);
        assert_eq!(setup.cache.get(flight_id).await.unwrap(), Some(10));

        service
            .create_reservation(ReservationRequest::new(flight_id, passenger(1), 2))
            .await
            .unwrap();

        assert_eq!(reader.available_seats(flight_id).await.unwrap(), 8);
    }

    /// Holds every load long enough to blow the deadline.
    struct SlowFlights;

    #[async_trait]
    impl FlightStore for SlowFlights {
        async fn load(&self, _id: Uuid) -> Result<Option<Flight>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
        async fn conditional_save(&self, _f: &Flight, _v: i64) -> Result<WriteOutcome, StoreError> {
            Ok(WriteOutcome::Committed)
        }
        async fn save_all(&self, f: Vec<Flight>) -> Result<Vec<Flight>, StoreError> {
            Ok(f)
        }
        async fn search(&self, _c: &FlightSearch) -> Result<Vec<Flight>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_deadline_bounds_the_whole_call() {
        let setup = Setup::new();
        let (service, _worker) = setup.service(Arc::new(SlowFlights), fast_retry());
        let service = service.with_deadline(Duration::from_millis(50));

        let result = service
            .create_reservation(ReservationRequest::new(Uuid::new_v4(), passenger(1), 1))
            .await;
        assert!(matches!(result, Err(ReservationError::DeadlineExceeded(_))));
    }


    /// Commits the flight write, then holds the acknowledgement back.
    struct SlowAck {
        inner: Arc<InMemoryFlightStore>,
        stall: Duration,
    }

    #[async_trait]
    impl FlightStore for SlowAck {
        async fn load(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
            self.inner.load(id).await
        }
        async fn conditional_save(&self, f: &Flight, v: i64) -> Result<WriteOutcome, StoreError> {
            let outcome = self.inner.conditional_save(f, v).await?;
            tokio::time::sleep(self.stall).await;
            Ok(outcome)
        }
        async fn save_all(&self, f: Vec<Flight>) -> Result<Vec<Flight>, StoreError> {
            self.inner.save_all(f).await
        }
        async fn search(&self, c: &FlightSearch) -> Result<Vec<Flight>, StoreError> {
            self.inner.search(c).await
        }
    }

    #[tokio::test]
    async fn test_deadline_after_commit_still_finishes_the_booking() {
        let setup = Setup::new();
        let flight_id = setup.flights.insert(fixtures::flight(10)).await.id;
        setup.cache.put(flight_id, 10).await.unwrap();
        let store = Arc::new(SlowAck {
            inner: setup.flights.clone(),
            stall: Duration::from_millis(200),
        });
        let (service, worker) = setup.service(store, fast_retry());
        let service = service.with_deadline(Duration::from_millis(50));

        let result = service
            .create_reservation(ReservationRequest::new(flight_id, passenger(1), 2))
            .await;
        assert!(matches!(result, Err(ReservationError::DeadlineExceeded(_))));

        // The worker drains once the abandoned attempt drops its pipeline handle.
        drop(service);
        worker.join().await;

        assert_eq!(setup.reservations.for_flight(flight_id).await.len(), 1);
        assert_eq!(setup.cache.get(flight_id).await.unwrap(), None);
        let reader = AvailabilityReader::new(setup.flights.clone(), setup.cache.clone());
        assert_eq!(reader.available_seats(flight_id).await.unwrap(), 8);

        let entries = setup.audit_for(flight_id).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AttemptStatus::Success);
        assert_eq!(entries[0].available_before, Some(10));
    }
}
