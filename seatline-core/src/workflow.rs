use chrono::Utc;
use seatline_shared::models::events::{AttemptStatus, FailureKind, ReservationAttemptedEvent};
use seatline_shared::Masked;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::AuditPipeline;
use crate::cache::AvailabilityCache;
use crate::repository::{FlightStore, ReservationStore, WriteOutcome};
use crate::reservation::{NewReservation, ReservationRequest, ReservationSummary};
use crate::ReservationError;

/// One reservation attempt: load, check, reserve, compare-and-swap, record,
/// invalidate, audit.
///
/// Every call emits exactly one audit event, whatever its outcome. A version
/// mismatch on the flight write surfaces as [`ReservationError::Conflict`] and
/// is left to the caller's retry policy.
#[derive(Clone)]
pub struct ReservationWorkflow {
    flights: Arc<dyn FlightStore>,
    reservations: Arc<dyn ReservationStore>,
    cache: Arc<dyn AvailabilityCache>,
    audit: AuditPipeline,
}

/// What the attempt learned before it stopped.
#[derive(Default)]
struct AttemptTrace {
    available_before: Option<i32>,
}

impl ReservationWorkflow {
    pub fn new(
        flights: Arc<dyn FlightStore>,
        reservations: Arc<dyn ReservationStore>,
        cache: Arc<dyn AvailabilityCache>,
        audit: AuditPipeline,
    ) -> Self {
        Self {
            flights,
            reservations,
            cache,
            audit,
        }
    }

    pub async fn attempt(
        &self,
        request: &ReservationRequest,
        attempt: usize,
    ) -> Result<ReservationSummary, ReservationError> {
        let mut trace = AttemptTrace::default();
        let result = self.run(request, &mut trace).await;

        match &result {
            Ok(summary) => {
                info!(
                    reservation_id = %summary.reservation_id,
                    flight_id = %summary.flight_id,
                    seats = summary.seats,
                    attempt,
                    "Reservation created"
                );
                self.audit.emit(self.event(
                    request,
                    trace.available_before,
                    AttemptStatus::Success,
                    None,
                    None,
                    Some(summary.reservation_id),
                ));
            }
            Err(err) => self.record_failure(request, &trace, err, attempt),
        }

        result
    }

    async fn run(
        &self,
        request: &ReservationRequest,
        trace: &mut AttemptTrace,
    ) -> Result<ReservationSummary, ReservationError> {
        let flight_id = request.flight_id;

        let mut flight = self
            .flights
            .load(flight_id)
            .await?
            .ok_or(ReservationError::FlightNotFound(flight_id))?;
        let expected_version = flight.version();
        trace.available_before = Some(flight.available_seats());

        // On a short flight this mutates nothing; the snapshot is dropped either way.
        flight.reserve(request.seats)?;

        match self.flights.conditional_save(&flight, expected_version).await? {
            WriteOutcome::Committed => {}
            WriteOutcome::VersionMismatch => return Err(ReservationError::Conflict(flight_id)),
        }

        let persisted = self
            .reservations
            .save(&NewReservation {
                flight_id,
                passenger: request.passenger.clone(),
                seats: request.seats,
            })
            .await?;

        // Committed seats outlive a failed eviction; the booking still succeeds.
        if let Err(e) = self.cache.evict(flight_id).await {
            error!(%flight_id, "Failed to evict availability cache entry: {}", e);
        }

        Ok(ReservationSummary {
            reservation_id: persisted.id,
            flight_id,
            passenger: request.passenger.clone(),
            seats: request.seats,
            created_at: persisted.created_at,
        })
    }

    fn record_failure(
        &self,
        request: &ReservationRequest,
        trace: &AttemptTrace,
        err: &ReservationError,
        attempt: usize,
    ) {
        let flight_id = request.flight_id;
        let (kind, available_before, message) = match err {
            ReservationError::FlightNotFound(_) => {
                warn!(%flight_id, attempt, "Reservation rejected, flight not found");
                (FailureKind::NotFound, None, err.to_string())
            }
            ReservationError::InsufficientSeats { available, requested } => {
                warn!(%flight_id, available, requested, attempt, "Reservation rejected, insufficient seats");
                (FailureKind::InsufficientSeats, Some(*available), "insufficient seats".to_string())
            }
            ReservationError::Conflict(_) => {
                warn!(%flight_id, attempt, "Concurrent update detected on flight");
                (FailureKind::Conflict, trace.available_before, "concurrency conflict".to_string())
            }
            other => {
                error!(
                    %flight_id,
                    passenger = %Masked(&request.passenger.email),
                    attempt,
                    "Reservation failed: {}", other
                );
                (
                    FailureKind::Unexpected,
                    Some(trace.available_before.unwrap_or(0)),
                    other.to_string(),
                )
            }
        };

        self.audit.emit(self.event(
            request,
            available_before,
            AttemptStatus::Failed,
            Some(kind),
            Some(message),
            None,
        ));
    }

    fn event(
        &self,
        request: &ReservationRequest,
        available_before: Option<i32>,
        status: AttemptStatus,
        failure_kind: Option<FailureKind>,
        error_message: Option<String>,
        reservation_id: Option<Uuid>,
    ) -> ReservationAttemptedEvent {
        ReservationAttemptedEvent {
            flight_id: request.flight_id,
            passenger_email: request.passenger.email.clone(),
            requested_seats: request.seats,
            available_before,
            status,
            failure_kind,
            error_message,
            reservation_id,
            occurred_at: Utc::now(),
        }
    }
}
