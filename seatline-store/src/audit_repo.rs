use async_trait::async_trait;
use seatline_core::repository::AuditStore;
use seatline_core::{AuditLogEntry, StoreError};

use crate::database::store_error;

/// Writes audit rows on their own connection, outside any booking transaction.
pub struct PostgresAuditRepository {
    pub pool: sqlx::PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditRepository {
    async fn save(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, timestamp, flight_id, passenger_email, requested_seats,
                                    available_before, status, failure_kind, error_message, reservation_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(entry.flight_id)
        .bind(&entry.passenger_email)
        .bind(entry.requested_seats)
        .bind(entry.available_before)
        .bind(entry.status.as_str())
        .bind(entry.failure_kind.map(|k| k.as_str()))
        .bind(entry.error_message.as_deref().map(truncate_message))
        .bind(entry.reservation_id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}

/// `error_message` is VARCHAR(500).
fn truncate_message(message: &str) -> String {
    message.chars().take(500).collect()
}
