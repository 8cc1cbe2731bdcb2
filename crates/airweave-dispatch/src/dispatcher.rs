//! Concurrent-then-postgres-last dispatch (spec §4.7), ported from
//! `platform/sync/actions/dispatcher.py`'s `ActionDispatcher`: every
//! non-metadata handler runs concurrently and fails fast as a group; the
//! metadata handler only runs once all of them have succeeded, so a vector
//! store and the metadata table never disagree about what was written.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error};
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

use crate::batch::DispatchBatch;
use crate::handler::ActionHandler;

pub struct ActionDispatcher {
    destination_handlers: Vec<Arc<dyn ActionHandler>>,
    metadata_handler: Option<Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    /// `metadata_handler` is kept separate from `destination_handlers` by
    /// the caller (rather than detected by type, as the Python version
    /// does with `isinstance`) since Rust has no reflection over trait
    /// objects.
    pub fn new(
        destination_handlers: Vec<Arc<dyn ActionHandler>>,
        metadata_handler: Option<Arc<dyn ActionHandler>>,
    ) -> Self {
        Self {
            destination_handlers,
            metadata_handler,
        }
    }

    pub async fn dispatch(&self, batch: &DispatchBatch) -> Result<()> {
        if !batch.has_mutations() {
            debug!("dispatcher: no mutations to dispatch");
            return Ok(());
        }

        debug!(
            summary = %batch.summary(),
            handlers = ?self.destination_handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            "dispatching action batch"
        );

        self.dispatch_to_destinations(batch).await?;

        if let Some(metadata) = &self.metadata_handler {
            metadata.handle_batch(batch).await.map_err(|e| {
                error!(error = %e, "postgres metadata handler failed");
                AirweaveError::SyncFailure(format!("postgres handler failed: {e}"))
            })?;
        }

        debug!("dispatcher: all handlers completed");
        Ok(())
    }

    pub async fn dispatch_orphan_cleanup(&self, orphan_ids: &[Uuid], sync_id: Uuid) -> Result<()> {
        if orphan_ids.is_empty() {
            return Ok(());
        }

        debug!(count = orphan_ids.len(), "dispatching orphan cleanup");

        let results = join_all(
            self.destination_handlers
                .iter()
                .map(|h| h.handle_orphan_cleanup(orphan_ids, sync_id)),
        )
        .await;

        let failures = collect_failures(&self.destination_handlers, results);
        if !failures.is_empty() {
            return Err(AirweaveError::SyncFailure(format!(
                "orphan cleanup failed: {}",
                failures.join(", ")
            )));
        }

        if let Some(metadata) = &self.metadata_handler {
            metadata.handle_orphan_cleanup(orphan_ids, sync_id).await?;
        }

        Ok(())
    }

    async fn dispatch_to_destinations(&self, batch: &DispatchBatch) -> Result<()> {
        if self.destination_handlers.is_empty() {
            return Ok(());
        }

        let results = join_all(self.destination_handlers.iter().map(|h| h.handle_batch(batch))).await;

        let failures = collect_failures(&self.destination_handlers, results);
        if !failures.is_empty() {
            error!(failures = ?failures, "destination handler failures");
            return Err(AirweaveError::SyncFailure(format!(
                "handler(s) failed: {}",
                failures.join(", ")
            )));
        }

        Ok(())
    }
}

fn collect_failures(
    handlers: &[Arc<dyn ActionHandler>],
    results: Vec<Result<()>>,
) -> Vec<String> {
    handlers
        .iter()
        .zip(results)
        .filter_map(|(handler, result)| match result {
            Ok(()) => None,
            Err(e) => Some(format!("{}: {e}", handler.name())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ActionHandler for CountingHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle_batch(&self, _batch: &DispatchBatch) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AirweaveError::ProviderPermanent("boom".into()));
            }
            Ok(())
        }

        async fn handle_orphan_cleanup(&self, _orphan_ids: &[Uuid], _sync_id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn batch_with_one_insert() -> DispatchBatch {
        use airweave_common::entity::{ChunkEntity, Entity, EntityCommon};

        let mut batch = DispatchBatch::default();
        batch.inserts.push(crate::batch::PreparedInsert {
            id: Uuid::new_v4(),
            entity: Entity::Chunk(ChunkEntity {
                common: EntityCommon {
                    source_entity_id: "a".into(),
                    entity_type_id: "doc".into(),
                    breadcrumbs: vec![],
                    display_name: "A".into(),
                    created_at: None,
                    updated_at: None,
                    payload: serde_json::json!({}),
                    embeddable_fields: vec![],
                },
                textual_representation: "a".into(),
                chunk_index: None,
            }),
            hash: "h".into(),
            vectors: vec![],
            raw: None,
        });
        batch
    }

    #[tokio::test]
    async fn metadata_handler_runs_only_after_destinations_succeed() {
        let metadata_calls = Arc::new(AtomicUsize::new(0));
        let destination_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = ActionDispatcher::new(
            vec![Arc::new(CountingHandler {
                name: "vectordb",
                calls: destination_calls.clone(),
                fail: false,
            })],
            Some(Arc::new(CountingHandler {
                name: "postgres",
                calls: metadata_calls.clone(),
                fail: false,
            })),
        );

        dispatcher.dispatch(&batch_with_one_insert()).await.unwrap();

        assert_eq!(destination_calls.load(Ordering::SeqCst), 1);
        assert_eq!(metadata_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metadata_handler_never_runs_when_a_destination_fails() {
        let metadata_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = ActionDispatcher::new(
            vec![Arc::new(CountingHandler {
                name: "vectordb",
                calls: Arc::new(AtomicUsize::new(0)),
                fail: true,
            })],
            Some(Arc::new(CountingHandler {
                name: "postgres",
                calls: metadata_calls.clone(),
                fail: false,
            })),
        );

        let result = dispatcher.dispatch(&batch_with_one_insert()).await;

        assert!(result.is_err());
        assert_eq!(metadata_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_dispatches_to_nobody() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = ActionDispatcher::new(
            vec![Arc::new(CountingHandler {
                name: "vectordb",
                calls: calls.clone(),
                fail: false,
            })],
            None,
        );

        dispatcher.dispatch(&DispatchBatch::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
