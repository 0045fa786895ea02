use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repository::FlightStore;
use crate::{ReservationError, StoreError};

/// Derived available-seat counts keyed by flight id. Not a source of truth.
///
/// Entries never expire on their own; whoever changes a flight's reserved
/// seats must evict its entry.
#[async_trait]
pub trait AvailabilityCache: Send + Sync {
    async fn get(&self, flight_id: Uuid) -> Result<Option<i32>, StoreError>;
    async fn put(&self, flight_id: Uuid, available: i32) -> Result<(), StoreError>;
    async fn evict(&self, flight_id: Uuid) -> Result<(), StoreError>;
}

/// Read-through availability lookups.
#[derive(Clone)]
pub struct AvailabilityReader {
    flights: Arc<dyn FlightStore>,
    cache: Arc<dyn AvailabilityCache>,
}

impl AvailabilityReader {
    pub fn new(flights: Arc<dyn FlightStore>, cache: Arc<dyn AvailabilityCache>) -> Self {
        Self { flights, cache }
    }

    pub async fn available_seats(&self, flight_id: Uuid) -> Result<i32, ReservationError> {
        // Cache failures fall through to the flight store.
        match self.cache.get(flight_id).await {
            Ok(Some(count)) => return Ok(count),
            Ok(None) => debug!(%flight_id, "Availability cache miss"),
            Err(e) => warn!(%flight_id, "Availability cache read failed: {}", e),
        }

        let flight = self
            .flights
            .load(flight_id)
            .await?
            .ok_or(ReservationError::FlightNotFound(flight_id))?;
        let available = flight.available_seats();

        if let Err(e) = self.cache.put(flight_id, available).await {
            warn!(%flight_id, "Failed to populate availability cache: {}", e);
        }

        Ok(available)
    }
}
