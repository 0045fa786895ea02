use seatline_core::{FlightCatalog, ReservationService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub catalog: Arc<FlightCatalog>,
}

impl AppState {
    pub fn new(reservations: ReservationService, catalog: FlightCatalog) -> Self {
        Self {
            reservations: Arc::new(reservations),
            catalog: Arc::new(catalog),
        }
    }
}
