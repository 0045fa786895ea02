use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seatline_core::ReservationError;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Flight {0} not found")]
    FlightNotFound(Uuid),
    #[error("Not enough seats available: {available} left, {requested} requested")]
    InsufficientSeats { available: i32, requested: i32 },
    #[error("The flight was modified by another booking, please try again")]
    ConflictError(Uuid),
    #[error("Request timed out")]
    Timeout,
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::FlightNotFound(_) => "FLIGHT_NOT_FOUND",
            AppError::InsufficientSeats { .. } => "INSUFFICIENT_SEATS",
            AppError::ConflictError(_) => "RESERVATION_CONFLICT",
            AppError::Timeout => "TIMEOUT",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InsufficientSeats { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::FlightNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConflictError(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::FlightNotFound(id) | AppError::ConflictError(id) => json!({ "flight_id": id }),
            AppError::InsufficientSeats { available, requested } => {
                json!({ "available": available, "requested": requested })
            }
            _ => Value::Null,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
            "details": self.details(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InvalidRequest(msg) => AppError::ValidationError(msg),
            ReservationError::FlightNotFound(id) => AppError::FlightNotFound(id),
            ReservationError::InsufficientSeats { available, requested } => {
                AppError::InsufficientSeats { available, requested }
            }
            ReservationError::Conflict(id) => AppError::ConflictError(id),
            ReservationError::DeadlineExceeded(_) => AppError::Timeout,
            ReservationError::Unexpected(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
