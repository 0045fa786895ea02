use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::AuditLogEntry;
use crate::flight::Flight;
use crate::reservation::{NewReservation, PersistedReservation};
use crate::search::FlightSearch;
use crate::StoreError;

/// Result of a compare-and-swap write on a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,
    /// Another writer committed first; the stored version no longer matches.
    VersionMismatch,
}

/// Flight data access
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Loads the flight with its current version.
    async fn load(&self, id: Uuid) -> Result<Option<Flight>, StoreError>;

    /// Persists `flight`'s inventory only if the stored version still equals
    /// `expected_version`, bumping the version on success.
    async fn conditional_save(
        &self,
        flight: &Flight,
        expected_version: i64,
    ) -> Result<WriteOutcome, StoreError>;

    async fn save_all(&self, flights: Vec<Flight>) -> Result<Vec<Flight>, StoreError>;

    async fn search(&self, criteria: &FlightSearch) -> Result<Vec<Flight>, StoreError>;
}

/// Reservation data access
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn save(&self, reservation: &NewReservation) -> Result<PersistedReservation, StoreError>;
}

/// Audit log data access. Errors never reach the booking path.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn save(&self, entry: &AuditLogEntry) -> Result<(), StoreError>;
}
