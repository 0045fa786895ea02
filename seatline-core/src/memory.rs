//! In-process implementations of the store and cache traits.
//!
//! Used by the test suites and by the API when no database is configured.
//! `InMemoryFlightStore::conditional_save` is atomic under its write lock, so it
//! gives the same compare-and-swap guarantee as the Postgres store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::AuditLogEntry;
use crate::cache::AvailabilityCache;
use crate::flight::Flight;
use crate::repository::{AuditStore, FlightStore, ReservationStore, WriteOutcome};
use crate::reservation::{NewReservation, Passenger, PersistedReservation};
use crate::search::FlightSearch;
use crate::StoreError;

#[derive(Default)]
pub struct InMemoryFlightStore {
    flights: RwLock<HashMap<Uuid, Flight>>,
}

impl InMemoryFlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, flight: Flight) -> Flight {
        self.flights.write().await.insert(flight.id, flight.clone());
        flight
    }
}

#[async_trait]
impl FlightStore for InMemoryFlightStore {
    async fn load(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        Ok(self.flights.read().await.get(&id).cloned())
    }

    async fn conditional_save(
        &self,
        flight: &Flight,
        expected_version: i64,
    ) -> Result<WriteOutcome, StoreError> {
        let mut flights = self.flights.write().await;
        let stored = flights
            .get(&flight.id)
            .ok_or_else(|| StoreError::Unavailable(format!("flight {} vanished", flight.id)))?;
        if stored.version() != expected_version {
            return Ok(WriteOutcome::VersionMismatch);
        }
        flights.insert(flight.id, flight.clone().committed(Utc::now()));
        Ok(WriteOutcome::Committed)
    }

    async fn save_all(&self, flights: Vec<Flight>) -> Result<Vec<Flight>, StoreError> {
        let mut stored = self.flights.write().await;
        for flight in &flights {
            stored.insert(flight.id, flight.clone());
        }
        Ok(flights)
    }

    async fn search(&self, criteria: &FlightSearch) -> Result<Vec<Flight>, StoreError> {
        let flights = self.flights.read().await;
        Ok(criteria.apply(flights.values().cloned()))
    }
}

/// A reservation row as held in memory.
#[derive(Debug, Clone)]
pub struct StoredReservation {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub passenger: Passenger,
    pub seats: i32,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryReservationStore {
    reservations: RwLock<Vec<StoredReservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn for_flight(&self, flight_id: Uuid) -> Vec<StoredReservation> {
        self.reservations
            .read()
            .await
            .iter()
            .filter(|r| r.flight_id == flight_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn save(&self, reservation: &NewReservation) -> Result<PersistedReservation, StoreError> {
        let persisted = PersistedReservation {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        self.reservations.write().await.push(StoredReservation {
            id: persisted.id,
            flight_id: reservation.flight_id,
            passenger: reservation.passenger.clone(),
            seats: reservation.seats,
            created_at: persisted.created_at,
        });
        Ok(persisted)
    }
}

#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn for_flight(&self, flight_id: Uuid) -> Vec<AuditLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.flight_id == flight_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn save(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAvailabilityCache {
    entries: RwLock<HashMap<Uuid, i32>>,
}

impl InMemoryAvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityCache for InMemoryAvailabilityCache {
    async fn get(&self, flight_id: Uuid) -> Result<Option<i32>, StoreError> {
        Ok(self.entries.read().await.get(&flight_id).copied())
    }

    async fn put(&self, flight_id: Uuid, available: i32) -> Result<(), StoreError> {
        self.entries.write().await.insert(flight_id, available);
        Ok(())
    }

    async fn evict(&self, flight_id: Uuid) -> Result<(), StoreError> {
        self.entries.write().await.remove(&flight_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::fixtures;

    #[tokio::test]
    async fn test_conditional_save_requires_matching_version() {
        let store = InMemoryFlightStore::new();
        let flight = store.insert(fixtures::flight(10)).await;

        let mut first = store.load(flight.id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.reserve(2).unwrap();
        assert_eq!(
            store.conditional_save(&first, 0).await.unwrap(),
            WriteOutcome::Committed
        );

        second.reserve(3).unwrap();
        assert_eq!(
            store.conditional_save(&second, 0).await.unwrap(),
            WriteOutcome::VersionMismatch
        );

        let stored = store.load(flight.id).await.unwrap().unwrap();
        assert_eq!(stored.reserved_seats(), 2);
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_cache_evict_removes_entry() {
        let cache = InMemoryAvailabilityCache::new();
        let id = Uuid::new_v4();
        cache.put(id, 8).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), Some(8));
        cache.evict(id).await.unwrap();
        assert_eq!(cache.get(id).await.unwrap(), None);
    }
}
