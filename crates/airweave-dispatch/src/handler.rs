//! The handler contract every dispatch target implements (spec §4.7).
//! Mirrors the Python `ActionHandler` base: one method for the mutation
//! batch, one for end-of-sync orphan cleanup.

use async_trait::async_trait;
use uuid::Uuid;

use airweave_common::error::Result;

use crate::batch::DispatchBatch;

#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle_batch(&self, batch: &DispatchBatch) -> Result<()>;

    async fn handle_orphan_cleanup(&self, orphan_ids: &[Uuid], sync_id: Uuid) -> Result<()>;
}
