//! Per-organization-per-source rate limit overrides (spec original_source
//! supplement: `core/rate_limiter_service.py` loads per-source limits from a
//! config table rather than hardcoding them, keyed the same way the Redis
//! cache key for this config is formatted — see
//! `airweave_ratelimit::SourceLimiter::config_cache_key`).

use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};
use airweave_ratelimit::SourceRateLimitConfig;

pub struct SourceRateLimitConfigStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SourceRateLimitConfigStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        source_short_name: &str,
    ) -> Result<Option<SourceRateLimitConfig>> {
        let row: Option<(i32, i64)> = sqlx::query_as(
            r#"SELECT "limit", window_seconds FROM source_rate_limit WHERE organization_id = $1 AND source_short_name = $2"#,
        )
        .bind(organization_id)
        .bind(source_short_name)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|(limit, window_secs)| SourceRateLimitConfig {
            limit: limit as u32,
            window_secs: window_secs as u64,
        }))
    }

    pub async fn upsert(
        &self,
        organization_id: Uuid,
        source_short_name: &str,
        config: SourceRateLimitConfig,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO source_rate_limit (organization_id, source_short_name, "limit", window_seconds)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (organization_id, source_short_name)
            DO UPDATE SET "limit" = EXCLUDED."limit", window_seconds = EXCLUDED.window_seconds
            "#,
        )
        .bind(organization_id)
        .bind(source_short_name)
        .bind(config.limit as i32)
        .bind(config.window_secs as i64)
        .execute(self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("source rate limit config store error: {e}"))
}
