//! The `connection` table: a named, credentialed binding to a source or
//! destination (spec §3, §6).

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectionRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub short_name: String,
    pub name: String,
    pub config_jsonb: Value,
}

pub struct ConnectionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ConnectionStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        short_name: &str,
        name: &str,
        config: &Value,
    ) -> Result<ConnectionRow> {
        sqlx::query_as::<_, ConnectionRow>(
            r#"
            INSERT INTO connection (id, organization_id, short_name, name, config_jsonb)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, short_name, name, config_jsonb
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(short_name)
        .bind(name)
        .bind(config)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ConnectionRow>> {
        sqlx::query_as::<_, ConnectionRow>(
            "SELECT id, organization_id, short_name, name, config_jsonb FROM connection WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("connection store error: {e}"))
}
