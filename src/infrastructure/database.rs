use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::migrate::MigrateError;
use tracing::{error, info, warn};

use crate::config::Config;

const CONNECT_RETRIES: u32 = 3;

/// Build the connection pool, retrying with exponential backoff
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let mut retries = CONNECT_RETRIES;
    let mut delay = Duration::from_secs(1);

    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .min_connections(config.db_min_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(config.db_idle_timeout_secs)))
            .max_lifetime(Some(Duration::from_secs(config.db_max_lifetime_secs)))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) if retries > 0 => {
                retries -= 1;
                warn!(
                    "Database connection failed, retrying in {:?} ({} retries left): {}",
                    delay, retries, e
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                error!("Failed to connect to database after retries: {}", e);
                return Err(e);
            }
        }
    };

    info!(
        max = config.db_max_connections,
        min = config.db_min_connections,
        acquire_timeout_secs = config.db_acquire_timeout_secs,
        "Database pool configured"
    );
    Ok(pool)
}

/// Apply the bundled schema migrations
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        error!("Failed to run migrations: {}", e);
        e
    })
}
