//! Wraps a [`Destination`] as an [`ActionHandler`] (spec §4.5, §4.7): an
//! update is a delete-by-parent-id followed by an insert, so a destination
//! never has to reconcile partial chunk sets itself.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use airweave_common::error::Result;
use airweave_destinations::{Destination, ProcessingRequirement};

use crate::batch::DispatchBatch;
use crate::handler::ActionHandler;

pub struct DestinationHandler {
    name: &'static str,
    destination: Arc<dyn Destination>,
}

impl DestinationHandler {
    pub fn new(name: &'static str, destination: Arc<dyn Destination>) -> Self {
        Self { name, destination }
    }
}

#[async_trait]
impl ActionHandler for DestinationHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle_batch(&self, batch: &DispatchBatch) -> Result<()> {
        let update_parent_ids: Vec<Uuid> = batch.updates.iter().map(|u| u.db_id).collect();
        if !update_parent_ids.is_empty() {
            self.destination
                .bulk_delete_by_parent_ids(&update_parent_ids, batch.sync_id)
                .await?;
        }

        let delete_ids: Vec<Uuid> = batch.deletes.iter().map(|d| d.db_id).collect();
        if !delete_ids.is_empty() {
            self.destination.bulk_delete(&delete_ids, batch.sync_id).await?;
        }

        match self.destination.processing_requirement() {
            ProcessingRequirement::ChunksAndEmbeddings => {
                let vectors: Vec<_> = batch
                    .inserts
                    .iter()
                    .flat_map(|i| i.vectors.iter().cloned())
                    .chain(batch.updates.iter().flat_map(|u| u.vectors.iter().cloned()))
                    .collect();
                if !vectors.is_empty() {
                    self.destination.bulk_insert(&vectors).await?;
                }
            }
            ProcessingRequirement::RawEntities => {
                let raws: Vec<_> = batch
                    .inserts
                    .iter()
                    .filter_map(|i| i.raw.clone())
                    .chain(batch.updates.iter().filter_map(|u| u.raw.clone()))
                    .collect();
                if !raws.is_empty() {
                    self.destination.bulk_insert_raw(&raws).await?;
                }
            }
        }

        Ok(())
    }

    async fn handle_orphan_cleanup(&self, orphan_ids: &[Uuid], sync_id: Uuid) -> Result<()> {
        if orphan_ids.is_empty() {
            return Ok(());
        }
        self.destination.bulk_delete(orphan_ids, sync_id).await
    }
}
