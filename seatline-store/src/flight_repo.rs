use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seatline_core::repository::{FlightStore, WriteOutcome};
use seatline_core::{Flight, FlightDetails, FlightSearch, SortKey, StoreError};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::database::store_error;

const FLIGHT_COLUMNS: &str = r#"
    id, departure_at, arrival_at, origin, destination, price_cents, duration_minutes,
    capacity, reserved_seats, version, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    departure_at: DateTime<Utc>,
    arrival_at: DateTime<Utc>,
    origin: String,
    destination: String,
    price_cents: i64,
    duration_minutes: i32,
    capacity: i32,
    reserved_seats: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        let details = FlightDetails {
            departure_at: row.departure_at,
            arrival_at: row.arrival_at,
            origin: row.origin,
            destination: row.destination,
            price_cents: row.price_cents,
            duration_minutes: row.duration_minutes,
        };
        Flight::restore(
            row.id,
            details,
            row.capacity,
            row.reserved_seats,
            row.version,
            row.created_at,
            row.updated_at,
        )
        .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

pub struct PostgresFlightRepository {
    pub pool: sqlx::PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlightStore for PostgresFlightRepository {
    async fn load(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE id = $1",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(Flight::try_from).transpose()
    }

    async fn conditional_save(
        &self,
        flight: &Flight,
        expected_version: i64,
    ) -> Result<WriteOutcome, StoreError> {
        // Compare-and-swap on the version column; no row lock is taken on read.
        let result = sqlx::query(
            r#"
            UPDATE flights
            SET reserved_seats = $1, version = version + 1, updated_at = now()
            WHERE id = $2 AND version = $3 AND $1 <= capacity
            "#,
        )
        .bind(flight.reserved_seats())
        .bind(flight.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 1 {
            Ok(WriteOutcome::Committed)
        } else {
            debug!(flight_id = %flight.id, expected_version, "Flight version moved on");
            Ok(WriteOutcome::VersionMismatch)
        }
    }

    async fn save_all(&self, flights: Vec<Flight>) -> Result<Vec<Flight>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        for flight in &flights {
            sqlx::query(
                r#"
                INSERT INTO flights (id, departure_at, arrival_at, origin, destination, price_cents,
                                     duration_minutes, capacity, reserved_seats, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(flight.id)
            .bind(flight.details.departure_at)
            .bind(flight.details.arrival_at)
            .bind(&flight.details.origin)
            .bind(&flight.details.destination)
            .bind(flight.details.price_cents)
            .bind(flight.details.duration_minutes)
            .bind(flight.capacity())
            .bind(flight.reserved_seats())
            .bind(flight.version())
            .bind(flight.created_at)
            .bind(flight.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;
        Ok(flights)
    }

    async fn search(&self, criteria: &FlightSearch) -> Result<Vec<Flight>, StoreError> {
        let mut query = search_query(criteria);
        let rows = query
            .build_query_as::<FlightRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        rows.into_iter().map(Flight::try_from).collect()
    }
}

fn search_query(criteria: &FlightSearch) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {} FROM flights WHERE TRUE", FLIGHT_COLUMNS));

    if let Some(date) = criteria.departure_date {
        query.push(" AND (departure_at AT TIME ZONE 'UTC')::date = ").push_bind(date);
    }
    if let Some(date) = criteria.arrival_date {
        query.push(" AND (arrival_at AT TIME ZONE 'UTC')::date = ").push_bind(date);
    }
    if let Some(origin) = criteria.origin.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND origin ILIKE ").push_bind(like_pattern(origin));
    }
    if let Some(destination) = criteria.destination.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND destination ILIKE ").push_bind(like_pattern(destination));
    }

    query.push(match criteria.sort_key() {
        Some(SortKey::Price) => " ORDER BY price_cents ASC",
        Some(SortKey::Duration) => " ORDER BY duration_minutes ASC",
        None => " ORDER BY departure_at ASC",
    });
    query
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
