use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use seatline_core::{Flight, FlightDetails, FlightSearch, NewFlight};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FlightResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: FlightDetails,
    pub capacity: i32,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Flight> for FlightResponse {
    fn from(flight: Flight) -> Self {
        Self {
            id: flight.id,
            capacity: flight.capacity(),
            available_seats: flight.available_seats(),
            created_at: flight.created_at,
            details: flight.details,
        }
    }
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    flight_id: Uuid,
    available_seats: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", get(search_flights).post(create_flights))
        .route("/v1/flights/{id}/availability", get(flight_availability))
}

async fn search_flights(
    State(state): State<AppState>,
    criteria: Result<Query<FlightSearch>, QueryRejection>,
) -> Result<Json<Vec<FlightResponse>>, AppError> {
    let Query(criteria) = criteria?;
    let flights = state.catalog.search(&criteria).await?;
    Ok(Json(flights.into_iter().map(FlightResponse::from).collect()))
}

async fn create_flights(
    State(state): State<AppState>,
    body: Result<Json<Vec<NewFlight>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<FlightResponse>>), AppError> {
    let Json(requests) = body?;
    if requests.is_empty() {
        return Err(AppError::ValidationError("at least one flight is required".into()));
    }

    let flights = state.catalog.create_flights(requests).await?;
    Ok((
        StatusCode::CREATED,
        Json(flights.into_iter().map(FlightResponse::from).collect()),
    ))
}

async fn flight_availability(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let Path(flight_id) = id?;
    let available_seats = state.catalog.available_seats(flight_id).await?;
    Ok(Json(AvailabilityResponse { flight_id, available_seats }))
}
