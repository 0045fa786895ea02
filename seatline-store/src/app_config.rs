use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub reservation: ReservationConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub flights: FlightsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Conflict retry and deadline settings for the booking path.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReservationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AuditConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FlightsConfig {
    #[serde(default = "default_capacity")]
    pub default_capacity: i32,
}

fn default_max_connections() -> u32 { 5 }
fn default_max_attempts() -> usize { 3 }
fn default_initial_backoff_ms() -> u64 { 100 }
fn default_backoff_multiplier() -> u32 { 2 }
fn default_deadline_ms() -> u64 { seatline_core::service::DEFAULT_DEADLINE.as_millis() as u64 }
fn default_channel_capacity() -> usize { seatline_core::audit::DEFAULT_CHANNEL_CAPACITY }
fn default_capacity() -> i32 { seatline_core::flight::DEFAULT_CAPACITY }

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl ReservationConfig {
    pub fn retry_policy(&self) -> seatline_core::RetryPolicy {
        seatline_core::RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            self.backoff_multiplier,
        )
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { channel_capacity: default_channel_capacity() }
    }
}

impl Default for FlightsConfig {
    fn default() -> Self {
        Self { default_capacity: default_capacity() }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `SEATLINE_RESERVATION__MAX_ATTEMPTS=5`
            .add_source(config::Environment::with_prefix("SEATLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
