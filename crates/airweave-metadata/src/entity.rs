//! The `entity` table: one row per `(sync_id, source_entity_id,
//! entity_type_id)` holding the last-seen content hash (spec §3, §6).
//! Query shapes follow `rootsignal-domains::entities::models::embedding.rs`
//! (bind-parameterized `query_as` over tuples, `fetch_one`/`fetch_optional`).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};
use airweave_common::stored_entity::StoredEntityRecord;

pub struct EntityStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EntityStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Loads the currently stored rows for a sync, keyed by
    /// `(source_entity_id, entity_type_id)`, so the action resolver can diff
    /// an incoming batch against what's already on record.
    pub async fn load_for_sync(&self, sync_id: Uuid) -> Result<Vec<StoredEntityRecord>> {
        let rows: Vec<(Uuid, String, String, String)> = sqlx::query_as(
            "SELECT id, source_entity_id, entity_type_id, hash FROM entity WHERE sync_id = $1",
        )
        .bind(sync_id)
        .fetch_all(self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, source_entity_id, entity_type_id, hash)| StoredEntityRecord {
                key: airweave_common::entity::EntityKey {
                    sync_id,
                    source_entity_id,
                    entity_type_id,
                },
                db_id: id,
                hash,
            })
            .collect())
    }

    /// `id` is caller-supplied rather than generated here: the dispatcher
    /// allocates the parent id up front so destination handlers (which run
    /// before this metadata write) can stamp it onto vector/raw records as
    /// `parent_id` (spec §4.7).
    ///
    /// Takes any `PgExecutor` (pool or open transaction) so callers that
    /// must write a whole batch atomically can run it on one transaction
    /// instead of autocommitting row by row.
    pub async fn insert<'e, E>(
        &self,
        exec: E,
        id: Uuid,
        sync_id: Uuid,
        organization_id: Uuid,
        source_entity_id: &str,
        entity_type_id: &str,
        hash: &str,
    ) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO entity (id, sync_id, source_entity_id, entity_type_id, hash, organization_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(id)
        .bind(sync_id)
        .bind(source_entity_id)
        .bind(entity_type_id)
        .bind(hash)
        .bind(organization_id)
        .bind(now)
        .execute(exec)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    pub async fn update_hash<'e, E>(&self, exec: E, db_id: Uuid, hash: &str) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query("UPDATE entity SET hash = $1, updated_at = $2 WHERE id = $3")
            .bind(hash)
            .bind(Utc::now())
            .bind(db_id)
            .execute(exec)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Bulk delete by database id, used both for explicit DELETE signals and
    /// the end-of-sync orphan sweep (spec §4.7).
    pub async fn delete_by_ids<'e, E>(&self, exec: E, ids: &[Uuid]) -> Result<u64>
    where
        E: sqlx::PgExecutor<'e>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM entity WHERE id = ANY($1)")
            .bind(ids)
            .execute(exec)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    /// Rows present before this job started but not touched by it: the
    /// orphan set a full (non-incremental) sync must delete (spec §4.7, §8
    /// orphan-completeness invariant).
    pub async fn find_orphans(&self, sync_id: Uuid, touched_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM entity WHERE sync_id = $1 AND NOT (id = ANY($2))",
        )
        .bind(sync_id)
        .bind(touched_ids)
        .fetch_all(self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn delete_for_sync(&self, sync_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM entity WHERE sync_id = $1")
            .bind(sync_id)
            .execute(self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("metadata store error: {e}"))
}
