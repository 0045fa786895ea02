pub mod app_config;
pub mod audit_repo;
pub mod database;
pub mod flight_repo;
pub mod redis_repo;
pub mod reservation_repo;

pub use audit_repo::PostgresAuditRepository;
pub use database::DbClient;
pub use flight_repo::PostgresFlightRepository;
pub use redis_repo::RedisClient;
pub use reservation_repo::PostgresReservationRepository;
