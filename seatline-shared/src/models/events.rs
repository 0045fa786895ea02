use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Terminal status of one reservation attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Success,
    Failed,
}

/// Why a FAILED attempt failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    NotFound,
    InsufficientSeats,
    Conflict,
    Unexpected,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "SUCCESS",
            AttemptStatus::Failed => "FAILED",
        }
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "NOT_FOUND",
            FailureKind::InsufficientSeats => "INSUFFICIENT_SEATS",
            FailureKind::Conflict => "CONFLICT",
            FailureKind::Unexpected => "UNEXPECTED",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted once per terminal reservation attempt, retried attempts included.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReservationAttemptedEvent {
    pub flight_id: Uuid,
    pub passenger_email: String,
    pub requested_seats: i32,
    /// `None` when the flight could not be loaded.
    pub available_before: Option<i32>,
    pub status: AttemptStatus,
    pub failure_kind: Option<FailureKind>,
    pub error_message: Option<String>,
    pub reservation_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}
