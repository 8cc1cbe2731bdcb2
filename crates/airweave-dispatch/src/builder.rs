//! Assembles an [`ActionDispatcher`] from a [`HandlersConfig`], ported from
//! `platform/builders/dispatcher.py`: vector destination handlers and the
//! archive handler are gated independently, and the metadata (Postgres)
//! handler is always the last one to run regardless of build order — that
//! ordering lives in `ActionDispatcher::dispatch` itself, not here.

use std::sync::Arc;

use airweave_common::sync_config::HandlersConfig;

use crate::dispatcher::ActionDispatcher;
use crate::handler::ActionHandler;

#[derive(Default)]
pub struct DispatcherBuilder {
    destination_handlers: Vec<Arc<dyn ActionHandler>>,
    metadata_handler: Option<Arc<dyn ActionHandler>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one vector-destination handler per configured destination, gated
    /// by `enable_vector_handlers`.
    pub fn with_destination_handler(
        mut self,
        config: &HandlersConfig,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        if config.enable_vector_handlers {
            self.destination_handlers.push(handler);
        }
        self
    }

    /// Adds the archive (raw-data) handler, gated by `enable_raw_data_handler`.
    pub fn with_archive_handler(
        mut self,
        config: &HandlersConfig,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        if config.enable_raw_data_handler {
            self.destination_handlers.push(handler);
        }
        self
    }

    /// Sets the metadata handler, gated by `enable_postgres_handler`.
    pub fn with_metadata_handler(
        mut self,
        config: &HandlersConfig,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        if config.enable_postgres_handler {
            self.metadata_handler = Some(handler);
        }
        self
    }

    pub fn build(self) -> ActionDispatcher {
        ActionDispatcher::new(self.destination_handlers, self.metadata_handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    use airweave_common::error::Result;
    use airweave_common::sync_config::SyncConfig;

    use crate::batch::DispatchBatch;

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl ActionHandler for CountingHandler {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle_batch(&self, _batch: &DispatchBatch) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn handle_orphan_cleanup(&self, _orphan_ids: &[Uuid], _sync_id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn archive_only_preset_skips_vector_and_metadata_handlers() {
        let config = SyncConfig::archive_only();
        let vector_calls = Arc::new(AtomicUsize::new(0));
        let archive_calls = Arc::new(AtomicUsize::new(0));
        let metadata_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = DispatcherBuilder::new()
            .with_destination_handler(&config.handlers, Arc::new(CountingHandler(vector_calls.clone())))
            .with_archive_handler(&config.handlers, Arc::new(CountingHandler(archive_calls.clone())))
            .with_metadata_handler(&config.handlers, Arc::new(CountingHandler(metadata_calls.clone())))
            .build();

        let mut batch = DispatchBatch::default();
        batch.inserts.push(crate::batch::PreparedInsert {
            id: Uuid::new_v4(),
            entity: airweave_common::entity::Entity::Deletion(
                airweave_common::entity::DeletionSignal {
                    source_entity_id: "x".into(),
                    entity_type_id: "doc".into(),
                },
            ),
            hash: "h".into(),
            vectors: vec![],
            raw: None,
        });

        dispatcher.dispatch(&batch).await.unwrap();

        assert_eq!(vector_calls.load(Ordering::SeqCst), 0);
        assert_eq!(archive_calls.load(Ordering::SeqCst), 1);
        assert_eq!(metadata_calls.load(Ordering::SeqCst), 0);
    }
}
