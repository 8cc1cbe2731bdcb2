//! The `sync`, `sync_job`, and `sync_connection` tables (spec §3 Sync / Sync
//! job, §6).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};
use airweave_common::sync_config::SyncConfig;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub source_connection_id: Uuid,
    pub collection_id: Uuid,
    pub config_jsonb: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobCounters {
    pub inserted: i64,
    pub updated: i64,
    pub deleted: i64,
    pub kept: i64,
    pub skipped: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncJobRow {
    pub id: Uuid,
    pub sync_id: Uuid,
    pub status: String,
    pub inserted: i64,
    pub updated: i64,
    pub deleted: i64,
    pub kept: i64,
    pub skipped: i64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct SyncStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SyncStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        source_connection_id: Uuid,
        collection_id: Uuid,
        config: &SyncConfig,
    ) -> Result<SyncRow> {
        let config_jsonb = serde_json::to_value(config)
            .map_err(|e| AirweaveError::Validation(format!("invalid sync config: {e}")))?;

        sqlx::query_as::<_, SyncRow>(
            r#"
            INSERT INTO sync (id, organization_id, name, source_connection_id, collection_id, config_jsonb)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, name, source_connection_id, collection_id, config_jsonb
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .bind(source_connection_id)
        .bind(collection_id)
        .bind(config_jsonb)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<SyncRow>> {
        sqlx::query_as::<_, SyncRow>(
            "SELECT id, organization_id, name, source_connection_id, collection_id, config_jsonb FROM sync WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM sync WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn add_slot(&self, sync_id: Uuid, connection_id: Uuid, role: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_connection (sync_id, connection_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (sync_id, connection_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(sync_id)
        .bind(connection_id)
        .bind(role)
        .execute(self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Slots in ascending (Active, Shadow, Deprecated) order, ties broken by
    /// creation time, matching `DestinationSlot`'s `Ord` so callers don't
    /// need to re-sort.
    pub async fn list_slots(&self, sync_id: Uuid) -> Result<Vec<(Uuid, String, DateTime<Utc>)>> {
        let rows: Vec<(Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT connection_id, role, created_at FROM sync_connection WHERE sync_id = $1
            ORDER BY CASE role WHEN 'ACTIVE' THEN 0 WHEN 'SHADOW' THEN 1 ELSE 2 END, created_at
            "#,
        )
        .bind(sync_id)
        .fetch_all(self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows)
    }
}

pub struct SyncJobStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SyncJobStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn start(&self, sync_id: Uuid, effective_config: &SyncConfig) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let config_jsonb = serde_json::to_value(effective_config)
            .map_err(|e| AirweaveError::Validation(format!("invalid sync config: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO sync_job (id, sync_id, status, effective_config_jsonb)
            VALUES ($1, $2, 'running', $3)
            "#,
        )
        .bind(id)
        .bind(sync_id)
        .bind(config_jsonb)
        .execute(self.pool)
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    pub async fn update_counters(&self, job_id: Uuid, counters: &JobCounters) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sync_job SET inserted = $2, updated = $3, deleted = $4, kept = $5, skipped = $6
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(counters.inserted)
        .bind(counters.updated)
        .bind(counters.deleted)
        .bind(counters.kept)
        .bind(counters.skipped)
        .execute(self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn finish(&self, job_id: Uuid, status: &str, error: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE sync_job SET status = $2, error = $3, finished_at = now() WHERE id = $1",
        )
        .bind(job_id)
        .bind(status)
        .bind(error)
        .execute(self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Option<SyncJobRow>> {
        sqlx::query_as::<_, SyncJobRow>(
            r#"
            SELECT id, sync_id, status, inserted, updated, deleted, kept, skipped, error, started_at, finished_at
            FROM sync_job WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("sync store error: {e}"))
}
