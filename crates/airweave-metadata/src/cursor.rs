//! Per-sync cursor persistence (spec §3 Cursor, §6 `sync_cursor`).

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

pub struct CursorStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CursorStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Returns an empty object when no cursor row exists yet, since a
    /// brand-new sync has an implicit empty cursor rather than an error.
    pub async fn load(&self, sync_id: Uuid) -> Result<Value> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data_jsonb FROM sync_cursor WHERE sync_id = $1")
                .bind(sync_id)
                .fetch_optional(self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(|(v,)| v).unwrap_or_else(|| Value::Object(Default::default())))
    }

    /// Upserts the cursor. Skipped entirely by the caller when
    /// `cursor.skip_updates` is set (spec §4.4).
    pub async fn save(&self, sync_id: Uuid, data: &Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursor (sync_id, data_jsonb, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (sync_id) DO UPDATE SET data_jsonb = EXCLUDED.data_jsonb, updated_at = now()
            "#,
        )
        .bind(sync_id)
        .bind(data)
        .execute(self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("cursor store error: {e}"))
}
