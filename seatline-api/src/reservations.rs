use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use seatline_core::{ReservationRequest, ReservationSummary};
use seatline_shared::Masked;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/reservations", post(create_reservation))
}

async fn create_reservation(
    State(state): State<AppState>,
    body: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationSummary>), AppError> {
    let Json(req) = body?;
    info!(
        flight_id = %req.flight_id,
        seats = req.seats,
        passenger = %Masked(&req.passenger.email),
        "Reservation requested"
    );

    let summary = state.reservations.create_reservation(req).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
