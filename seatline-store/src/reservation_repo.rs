use async_trait::async_trait;
use chrono::Utc;
use seatline_core::repository::ReservationStore;
use seatline_core::reservation::{NewReservation, PersistedReservation};
use seatline_core::StoreError;
use uuid::Uuid;

use crate::database::store_error;

pub struct PostgresReservationRepository {
    pub pool: sqlx::PgPool,
}

impl PostgresReservationRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationRepository {
    async fn save(&self, reservation: &NewReservation) -> Result<PersistedReservation, StoreError> {
        let persisted = PersistedReservation {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO reservations (id, flight_id, passenger_name, passenger_surname, passenger_email, seats, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(persisted.id)
        .bind(reservation.flight_id)
        .bind(&reservation.passenger.name)
        .bind(&reservation.passenger.surname)
        .bind(&reservation.passenger.email)
        .bind(reservation.seats)
        .bind(persisted.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(persisted)
    }
}
