pub mod audit;
pub mod cache;
pub mod catalog;
pub mod flight;
pub mod memory;
pub mod repository;
pub mod reservation;
pub mod retry;
pub mod search;
pub mod service;
pub mod workflow;

use std::time::Duration;
use uuid::Uuid;

pub use audit::{AuditLogEntry, AuditPipeline, AuditWorker};
pub use cache::{AvailabilityCache, AvailabilityReader};
pub use catalog::FlightCatalog;
pub use flight::{Flight, FlightDetails, FlightError, NewFlight};
pub use repository::{AuditStore, FlightStore, ReservationStore, WriteOutcome};
pub use reservation::{Passenger, ReservationRequest, ReservationSummary};
pub use retry::RetryPolicy;
pub use search::{FlightSearch, SortKey};
pub use service::ReservationService;
pub use workflow::ReservationWorkflow;

/// Failure reported by a collaborator (flight, reservation, audit or cache store).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("{0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Everything `ReservationService::create_reservation` can return.
///
/// Callers branch on the variant; only `Conflict` is ever retried.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Invalid reservation request: {0}")]
    InvalidRequest(String),

    #[error("Flight {0} not found")]
    FlightNotFound(Uuid),

    #[error("Insufficient seats: available {available}, requested {requested}")]
    InsufficientSeats { available: i32, requested: i32 },

    #[error("Concurrent update on flight {0}, please retry")]
    Conflict(Uuid),

    #[error("Reservation did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Unexpected(#[from] StoreError),
}

impl ReservationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Conflict(_))
    }
}

impl From<FlightError> for ReservationError {
    fn from(err: FlightError) -> Self {
        match err {
            FlightError::InsufficientSeats { available, requested } => {
                ReservationError::InsufficientSeats { available, requested }
            }
            FlightError::Invalid(msg) => ReservationError::InvalidRequest(msg),
        }
    }
}

pub type CoreResult<T> = Result<T, ReservationError>;
