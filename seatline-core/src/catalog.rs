use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::cache::{AvailabilityCache, AvailabilityReader};
use crate::flight::{Flight, NewFlight, DEFAULT_CAPACITY};
use crate::repository::FlightStore;
use crate::search::FlightSearch;
use crate::CoreResult;

/// Read side of the flight inventory plus batch creation.
#[derive(Clone)]
pub struct FlightCatalog {
    flights: Arc<dyn FlightStore>,
    availability: AvailabilityReader,
    default_capacity: i32,
}

impl FlightCatalog {
    pub fn new(flights: Arc<dyn FlightStore>, cache: Arc<dyn AvailabilityCache>) -> Self {
        Self {
            availability: AvailabilityReader::new(flights.clone(), cache),
            flights,
            default_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_default_capacity(mut self, capacity: i32) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Validates the whole batch before writing any of it.
    pub async fn create_flights(&self, requests: Vec<NewFlight>) -> CoreResult<Vec<Flight>> {
        let flights = requests
            .into_iter()
            .map(|r| r.into_flight(self.default_capacity))
            .collect::<Result<Vec<_>, _>>()?;

        let saved = self.flights.save_all(flights).await?;
        info!(count = saved.len(), "Flights created");
        Ok(saved)
    }

    pub async fn search(&self, criteria: &FlightSearch) -> CoreResult<Vec<Flight>> {
        Ok(self.flights.search(criteria).await?)
    }

    pub async fn available_seats(&self, flight_id: Uuid) -> CoreResult<i32> {
        self.availability.available_seats(flight_id).await
    }
}
