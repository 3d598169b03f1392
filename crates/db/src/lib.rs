//! Postgres persistence for Groundwork.
//!
//! Models live in [`models`]; each table has a zero-sized repository in
//! [`repositories`] whose methods take `&PgPool` (or a transaction) first.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Maximum connections held by the pool.
pub const MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Tunable parameters for the connect-with-backoff strategy.
#[derive(Debug, Clone)]
pub struct ConnectRetryConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Total attempts before giving up (at least one is always made).
    pub max_attempts: u32,
}

impl Default for ConnectRetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

/// Calculate the next backoff delay, clamped to `config.max_delay`.
pub fn next_delay(current: Duration, config: &ConnectRetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Create a pool, retrying with exponential backoff while the database is
/// unreachable. Returns the last error once `max_attempts` is exhausted.
pub async fn create_pool_with_retry(
    database_url: &str,
    config: &ConnectRetryConfig,
) -> Result<DbPool, sqlx::Error> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match create_pool(database_url).await {
            Ok(pool) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Connected to database after retry");
                }
                return Ok(pool);
            }
            Err(err) if attempt < config.max_attempts.max(1) => {
                tracing::warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Database connection failed, retrying",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, config);
            }
            Err(err) => {
                tracing::error!(attempt, error = %err, "Giving up on database connection");
                return Err(err);
            }
        }
    }
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations under `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        let config = ConnectRetryConfig::default();
        let mut delay = config.initial_delay;
        let mut seen = Vec::new();
        for _ in 0..7 {
            delay = next_delay(delay, &config);
            seen.push(delay.as_secs());
        }
        assert_eq!(seen, vec![2, 4, 8, 16, 30, 30, 30]);
    }
}
