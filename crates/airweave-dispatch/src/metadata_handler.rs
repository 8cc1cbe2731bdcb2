//! Wraps [`EntityStore`] as the Postgres metadata handler (spec §4.7):
//! runs only after every destination handler has already succeeded, so a
//! metadata row never claims to describe a chunk set that doesn't exist.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};
use airweave_metadata::EntityStore;

use crate::batch::DispatchBatch;
use crate::handler::ActionHandler;

pub struct MetadataHandler {
    pool: PgPool,
}

impl MetadataHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionHandler for MetadataHandler {
    fn name(&self) -> &'static str {
        "postgres"
    }

    /// Runs the whole batch under one transaction (spec §5, invariant #10):
    /// a mid-batch failure must leave metadata exactly as it was before this
    /// call, never partially applied, or the next run's resolver re-derives
    /// INSERT for rows the destinations already hold.
    async fn handle_batch(&self, batch: &DispatchBatch) -> Result<()> {
        let store = EntityStore::new(&self.pool);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for insert in &batch.inserts {
            store
                .insert(
                    &mut *tx,
                    insert.id,
                    batch.sync_id,
                    batch.organization_id,
                    insert.entity.source_entity_id(),
                    insert.entity.entity_type_id(),
                    &insert.hash,
                )
                .await?;
        }

        for update in &batch.updates {
            store.update_hash(&mut *tx, update.db_id, &update.hash).await?;
        }

        let delete_ids: Vec<Uuid> = batch.deletes.iter().map(|d| d.db_id).collect();
        if !delete_ids.is_empty() {
            store.delete_by_ids(&mut *tx, &delete_ids).await?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn handle_orphan_cleanup(&self, orphan_ids: &[Uuid], _sync_id: Uuid) -> Result<()> {
        if orphan_ids.is_empty() {
            return Ok(());
        }
        EntityStore::new(&self.pool).delete_by_ids(&self.pool, orphan_ids).await?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("metadata transaction error: {e}"))
}
