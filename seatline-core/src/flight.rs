use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: i32 = 180;

/// Schedule, route and fare of a flight. Never touched by the booking path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightDetails {
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub origin: String,
    pub destination: String,
    /// Fare in minor currency units.
    pub price_cents: i64,
    pub duration_minutes: i32,
}

/// Seat inventory aggregate for one scheduled flight.
///
/// `0 <= reserved_seats <= capacity` holds for every value of this type: seats
/// can only be added through [`Flight::reserve`], which checks capacity first.
/// `version` is the optimistic concurrency token; stores bump it on every
/// committed write.
#[derive(Debug, Clone, Serialize)]
pub struct Flight {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: FlightDetails,
    capacity: i32,
    reserved_seats: i32,
    version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn new(details: FlightDetails, capacity: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            details,
            capacity,
            reserved_seats: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a flight from persisted state.
    pub fn restore(
        id: Uuid,
        details: FlightDetails,
        capacity: i32,
        reserved_seats: i32,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, FlightError> {
        if capacity <= 0 || reserved_seats < 0 || reserved_seats > capacity {
            return Err(FlightError::Invalid(format!(
                "flight {} has reserved_seats {} outside capacity {}",
                id, reserved_seats, capacity
            )));
        }
        Ok(Self {
            id,
            details,
            capacity,
            reserved_seats,
            version,
            created_at,
            updated_at,
        })
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn reserved_seats(&self) -> i32 {
        self.reserved_seats
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn available_seats(&self) -> i32 {
        self.capacity - self.reserved_seats
    }

    pub fn has_capacity_for(&self, seats: i32) -> bool {
        self.available_seats() >= seats
    }

    /// Takes `seats` out of the inventory, or fails without touching it.
    pub fn reserve(&mut self, seats: i32) -> Result<(), FlightError> {
        if seats <= 0 {
            return Err(FlightError::Invalid(format!(
                "seat count must be positive, got {}",
                seats
            )));
        }
        if !self.has_capacity_for(seats) {
            return Err(FlightError::InsufficientSeats {
                available: self.available_seats(),
                requested: seats,
            });
        }
        self.reserved_seats += seats;
        Ok(())
    }

    /// The state a store holds after committing this flight: next version, fresh `updated_at`.
    pub fn committed(mut self, at: DateTime<Utc>) -> Self {
        self.version += 1;
        self.updated_at = at;
        self
    }
}

/// Batch-creation input for one flight.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFlight {
    pub departure_date: NaiveDate,
    pub arrival_date: NaiveDate,
    pub origin: String,
    pub destination: String,
    pub price_cents: i64,
    pub duration_minutes: i32,
    #[serde(default)]
    pub capacity: Option<i32>,
}

impl NewFlight {
    pub fn validate(&self) -> Result<(), FlightError> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(FlightError::Invalid("origin and destination are required".into()));
        }
        if self.price_cents <= 0 {
            return Err(FlightError::Invalid("price must be positive".into()));
        }
        if self.duration_minutes <= 0 {
            return Err(FlightError::Invalid("duration must be positive".into()));
        }
        if matches!(self.capacity, Some(c) if c <= 0) {
            return Err(FlightError::Invalid("capacity must be positive".into()));
        }
        if self.arrival_date < self.departure_date {
            return Err(FlightError::Invalid("arrival date precedes departure date".into()));
        }
        Ok(())
    }

    /// Dates are taken as midnight UTC.
    pub fn into_flight(self, default_capacity: i32) -> Result<Flight, FlightError> {
        self.validate()?;
        let capacity = self.capacity.unwrap_or(default_capacity);
        if capacity <= 0 {
            return Err(FlightError::Invalid(format!(
                "default capacity must be positive, got {}",
                capacity
            )));
        }
        let details = FlightDetails {
            departure_at: self.departure_date.and_time(NaiveTime::MIN).and_utc(),
            arrival_at: self.arrival_date.and_time(NaiveTime::MIN).and_utc(),
            origin: self.origin.trim().to_string(),
            destination: self.destination.trim().to_string(),
            price_cents: self.price_cents,
            duration_minutes: self.duration_minutes,
        };
        Ok(Flight::new(details, capacity))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlightError {
    #[error("Insufficient seats: available {available}, requested {requested}")]
    InsufficientSeats { available: i32, requested: i32 },

    #[error("Invalid flight: {0}")]
    Invalid(String),
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn details(origin: &str, destination: &str) -> FlightDetails {
        FlightDetails {
            departure_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
            arrival_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            price_cents: 12_900,
            duration_minutes: 150,
        }
    }

    pub fn flight(capacity: i32) -> Flight {
        Flight::new(details("Paris", "Lisbon"), capacity)
    }
}
