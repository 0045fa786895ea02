use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};
use seatline_core::{AvailabilityCache, StoreError};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn get_flight_availability(&self, flight_id: Uuid) -> RedisResult<Option<i32>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(availability_key(flight_id)).await
    }

    pub async fn set_flight_availability(&self, flight_id: Uuid, count: i32) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(availability_key(flight_id), count).await
    }

    pub async fn delete_flight_availability(&self, flight_id: Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(availability_key(flight_id)).await?;
        debug!(%flight_id, "Availability entry evicted");
        Ok(())
    }
}

#[async_trait]
impl AvailabilityCache for RedisClient {
    async fn get(&self, flight_id: Uuid) -> Result<Option<i32>, StoreError> {
        self.get_flight_availability(flight_id).await.map_err(cache_error)
    }

    async fn put(&self, flight_id: Uuid, available: i32) -> Result<(), StoreError> {
        self.set_flight_availability(flight_id, available).await.map_err(cache_error)
    }

    async fn evict(&self, flight_id: Uuid) -> Result<(), StoreError> {
        self.delete_flight_availability(flight_id).await.map_err(cache_error)
    }
}

fn availability_key(flight_id: Uuid) -> String {
    format!("flight:{}:availability", flight_id)
}

fn cache_error(err: redis::RedisError) -> StoreError {
    if err.is_io_error() || err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::backend(err)
    }
}
