use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Pool sizing, overridable per environment
///
/// - `DB_MAX_CONNECTIONS` (default 10): tests should keep this at 1-2
/// - `DB_MIN_CONNECTIONS` (default 0)
/// - `DB_ACQUIRE_TIMEOUT_SECS` (default 3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn from_env() -> Self {
        Self {
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 0),
            acquire_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 3)),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Connect to PostgreSQL with settings taken from the environment
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let settings = PoolSettings::from_env();

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await
}

/// Apply the debt engine schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./db/migrations").run(pool).await
}
