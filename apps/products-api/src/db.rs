//! PostgreSQL connection and schema setup

use core_config::database::DatabaseConfig;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(config.url.as_str());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sqlx_logging);
    opt
}

/// Connect to PostgreSQL, retrying with exponential backoff while the server
/// comes up, then apply pending migrations.
pub async fn connect_and_migrate(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = retry_with_backoff(CONNECT_ATTEMPTS, INITIAL_RETRY_DELAY, || {
        Database::connect(connect_options(config))
    })
    .await?;
    info!("Successfully connected to PostgreSQL database");

    info!("Running products database migrations...");
    Migrator::up(&db, None).await?;
    info!("Migrations completed successfully");

    Ok(db)
}

async fn retry_with_backoff<F, Fut, T, E>(
    attempts: u32,
    initial_delay: Duration,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    let mut delay = initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                warn!("Operation failed after {} attempts: {}", attempts, e);
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {:?}...",
                    attempt, attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}
