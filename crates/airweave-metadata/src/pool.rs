//! Pool construction and migration, grounded on the SQLite schema helper in
//! `examples/abitofhelp-adaptive_pipeline/.../repositories/schema.rs`, adapted
//! to Postgres.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use airweave_common::error::{AirweaveError, Result};

/// Connects to Postgres and applies pending migrations, so a fresh
/// environment and an integration test see the same schema.
pub async fn connect_and_migrate(dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(dsn)
        .await
        .map_err(|e| AirweaveError::SyncFailure(format!("failed to connect to postgres: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AirweaveError::SyncFailure(format!("failed to run migrations: {e}")))?;

    Ok(pool)
}
