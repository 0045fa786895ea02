use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ReservationError;

/// Passenger details copied into the reservation at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub name: String,
    pub surname: String,
    pub email: String,
}

impl Passenger {
    fn validate(&self) -> Result<(), ReservationError> {
        if self.name.trim().is_empty() || self.surname.trim().is_empty() {
            return Err(ReservationError::InvalidRequest(
                "passenger name and surname are required".into(),
            ));
        }
        let valid_email = match self.email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !valid_email {
            return Err(ReservationError::InvalidRequest(format!(
                "invalid passenger email: {}",
                self.email
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub flight_id: Uuid,
    pub passenger: Passenger,
    pub seats: i32,
}

impl ReservationRequest {
    pub fn new(flight_id: Uuid, passenger: Passenger, seats: i32) -> Self {
        Self { flight_id, passenger, seats }
    }

    pub fn validate(&self) -> Result<(), ReservationError> {
        if self.seats < 1 {
            return Err(ReservationError::InvalidRequest(format!(
                "seat count must be at least 1, got {}",
                self.seats
            )));
        }
        self.passenger.validate()
    }
}

/// Reservation row about to be written. The flight owns capacity; this is only the grant record.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub flight_id: Uuid,
    pub passenger: Passenger,
    pub seats: i32,
}

/// Identity and creation time assigned by the reservation store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedReservation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// What a successful booking returns to the caller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReservationSummary {
    pub reservation_id: Uuid,
    pub flight_id: Uuid,
    pub passenger: Passenger,
    pub seats: i32,
    pub created_at: DateTime<Utc>,
}
