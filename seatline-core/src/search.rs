use chrono::NaiveDate;
use serde::Deserialize;

use crate::flight::Flight;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Duration,
}

impl SortKey {
    /// Unknown keys mean "no explicit sort".
    pub fn from_param(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "price" => Some(SortKey::Price),
            "duration" => Some(SortKey::Duration),
            _ => None,
        }
    }
}

/// Flight search criteria. Every filter is optional; set filters are combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightSearch {
    pub departure_date: Option<NaiveDate>,
    pub arrival_date: Option<NaiveDate>,
    /// Case-insensitive substring of the origin city.
    pub origin: Option<String>,
    /// Case-insensitive substring of the destination city.
    pub destination: Option<String>,
    pub sort: Option<String>,
}

impl FlightSearch {
    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort.as_deref().and_then(SortKey::from_param)
    }

    pub fn matches(&self, flight: &Flight) -> bool {
        let details = &flight.details;
        if let Some(date) = self.departure_date {
            if details.departure_at.date_naive() != date {
                return false;
            }
        }
        if let Some(date) = self.arrival_date {
            if details.arrival_at.date_naive() != date {
                return false;
            }
        }
        contains_ignore_case(&details.origin, self.origin.as_deref())
            && contains_ignore_case(&details.destination, self.destination.as_deref())
    }

    /// Filters and orders an in-memory set of flights. Without a sort key
    /// flights come back by departure time.
    pub fn apply(&self, flights: impl IntoIterator<Item = Flight>) -> Vec<Flight> {
        let mut result: Vec<Flight> = flights.into_iter().filter(|f| self.matches(f)).collect();
        match self.sort_key() {
            Some(SortKey::Price) => result.sort_by_key(|f| f.details.price_cents),
            Some(SortKey::Duration) => result.sort_by_key(|f| f.details.duration_minutes),
            None => result.sort_by_key(|f| f.details.departure_at),
        }
        result
    }
}

fn contains_ignore_case(value: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(n) if !n.is_empty() => value.to_lowercase().contains(&n.to_lowercase()),
        _ => true,
    }
}
