use anyhow::Context;
use seatline_api::{app, AppState};
use seatline_core::{
    AuditPipeline, AvailabilityCache, FlightCatalog, FlightStore, ReservationService,
    ReservationWorkflow,
};
use seatline_store::app_config::Config;
use seatline_store::{
    DbClient, PostgresAuditRepository, PostgresFlightRepository, PostgresReservationRepository,
    RedisClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seatline_api=debug,seatline_core=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Seatline API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let cache: Arc<dyn AvailabilityCache> = Arc::new(
        RedisClient::new(&config.redis.url)
            .await
            .context("Failed to connect to Redis")?,
    );
    let flights: Arc<dyn FlightStore> = Arc::new(PostgresFlightRepository::new(db.pool.clone()));
    let reservations = Arc::new(PostgresReservationRepository::new(db.pool.clone()));

    let (audit, audit_worker) = AuditPipeline::spawn(
        Arc::new(PostgresAuditRepository::new(db.pool.clone())),
        config.audit.channel_capacity,
    );

    let workflow = ReservationWorkflow::new(flights.clone(), reservations, cache.clone(), audit);
    let service = ReservationService::new(workflow)
        .with_retry_policy(config.reservation.retry_policy())
        .with_deadline(config.reservation.deadline());
    let catalog = FlightCatalog::new(flights, cache)
        .with_default_capacity(config.flights.default_capacity);

    let app = app(AppState::new(service, catalog));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last pipeline handles; the worker now drains and exits.
    tracing::info!("Draining audit queue");
    audit_worker.join().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
