//! The sync orchestrator (spec §4.8, C10): streams entities from a source
//! through a bounded queue, a pool of workers resolving and dispatching
//! micro-batches, and a guaranteed cleanup/completion tail regardless of how
//! the run ended.
//!
//! Grounded on `rootsignal-scout::core::scrape_pipeline::ScrapePipeline`
//! for the overall shape (a `cancelled: Arc<AtomicBool>` flag threaded
//! through a deps struct, checked at natural suspension points, with a
//! cleanup block that always runs). The worker pool itself has no direct
//! teacher analogue — `ScrapePipeline` processes one site serially — so its
//! shared-receiver/`join_all` structure is new, built from `tokio::sync`
//! primitives the rest of the workspace already uses.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{info, warn};
use uuid::Uuid;

use airweave_chunking::chunker::Chunker;
use airweave_chunking::embedder::Embedder;
use airweave_common::entity::Entity;
use airweave_common::error::{AirweaveError, Result};
use airweave_common::stored_entity::StoredEntityRecord;
use airweave_common::sync_config::SyncConfig;
use airweave_dispatch::{ActionDispatcher, DispatchBatch, PreparedInsert, PreparedUpdate};
use airweave_metadata::{CursorStore, EntityStore, JobCounters, JobStatus, SyncJobStore};
use airweave_resolver::resolve;
use airweave_sources::{RateLimitedHttpClient, Source};
use airweave_storage::StorageBackend;
use airweave_tracking::{Action, FinalStatus, StatePublisher, Tracker};

use crate::batching::{next_micro_batch, BatchingConfig};
use crate::cancellation::CancellationToken;
use crate::prepare::prepare_entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub job_id: Uuid,
    pub outcome: JobOutcome,
    pub error: Option<String>,
}

pub struct SyncOrchestrator {
    pool: sqlx::PgPool,
    source: Arc<dyn Source>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    storage: Arc<dyn StorageBackend>,
    dispatcher: ActionDispatcher,
    sync_id: Uuid,
    organization_id: Uuid,
    collection_id: Uuid,
    config: SyncConfig,
    batching: BatchingConfig,
    cancellation: CancellationToken,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: sqlx::PgPool,
        source: Arc<dyn Source>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        storage: Arc<dyn StorageBackend>,
        dispatcher: ActionDispatcher,
        sync_id: Uuid,
        organization_id: Uuid,
        collection_id: Uuid,
        config: SyncConfig,
        batching: BatchingConfig,
    ) -> Self {
        Self {
            pool,
            source,
            chunker,
            embedder,
            storage,
            dispatcher,
            sync_id,
            organization_id,
            collection_id,
            config,
            batching,
            cancellation: CancellationToken::new(),
        }
    }

    /// A clone of the cancellation signal, for a caller to stop the sync
    /// from outside (e.g. on an API-level cancel request).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub async fn run(
        &self,
        mut http: RateLimitedHttpClient,
        state_publisher: Option<StatePublisher>,
    ) -> Result<SyncOutcome> {
        let job_id = SyncJobStore::new(&self.pool)
            .start(self.sync_id, &self.config)
            .await?;
        info!(sync_id = %self.sync_id, job_id = %job_id, "sync job started");

        let tracker = Arc::new(Tracker::new());
        let state_publisher = state_publisher.map(|p| Arc::new(AsyncMutex::new(p)));
        let failure: Arc<StdMutex<Option<AirweaveError>>> = Arc::new(StdMutex::new(None));

        let result = self
            .run_inner(&mut http, &tracker, &state_publisher, &failure)
            .await;

        if let Err(e) = self.storage.cleanup_temp(&job_id.to_string()).await {
            warn!(error = %e, job_id = %job_id, "temp cleanup failed");
        }

        let first_failure = failure.lock().expect("failure mutex never poisoned").take();
        let error = result.err().or(first_failure);

        let outcome = if error.is_some() {
            JobOutcome::Failed
        } else if self.cancellation.is_cancelled() {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Completed
        };

        let final_status = match outcome {
            JobOutcome::Completed => FinalStatus::Completed,
            JobOutcome::Failed => FinalStatus::Failed,
            JobOutcome::Cancelled => FinalStatus::Cancelled,
        };
        let error_message = error.as_ref().map(ToString::to_string);

        if let Some(publisher) = &state_publisher {
            let mut publisher = publisher.lock().await;
            if let Err(e) = publisher
                .publish_completion(&tracker, final_status, error_message.as_deref())
                .await
            {
                warn!(error = %e, job_id = %job_id, "completion publish failed");
            }
        }

        SyncJobStore::new(&self.pool)
            .update_counters(job_id, &counters_from(&tracker))
            .await?;
        SyncJobStore::new(&self.pool)
            .finish(
                job_id,
                job_status(outcome).as_str(),
                error_message.as_deref(),
            )
            .await?;

        info!(job_id = %job_id, outcome = ?outcome, "sync job finished");

        Ok(SyncOutcome {
            job_id,
            outcome,
            error: error_message,
        })
    }

    async fn run_inner(
        &self,
        http: &mut RateLimitedHttpClient,
        tracker: &Arc<Tracker>,
        state_publisher: &Option<Arc<AsyncMutex<StatePublisher>>>,
        failure: &Arc<StdMutex<Option<AirweaveError>>>,
    ) -> Result<()> {
        let cursor = if self.config.cursor.skip_load {
            Value::Object(Default::default())
        } else {
            CursorStore::new(&self.pool).load(self.sync_id).await?
        };

        let existing = EntityStore::new(&self.pool).load_for_sync(self.sync_id).await?;
        let snapshot = Arc::new(AsyncMutex::new(existing));
        let touched: Arc<StdMutex<HashSet<Uuid>>> = Arc::new(StdMutex::new(HashSet::new()));

        let (tx, rx) = mpsc::channel::<Entity>(self.batching.queue_capacity);
        let rx = Arc::new(AsyncMutex::new(rx));

        let producer = self.produce(http, cursor, tx);

        let worker_count = self.batching.worker_count.max(1);
        let workers = (0..worker_count).map(|_| {
            self.worker_loop(
                rx.clone(),
                snapshot.clone(),
                touched.clone(),
                tracker.clone(),
                state_publisher.clone(),
                failure.clone(),
            )
        });

        let (_produced, _) = futures::join!(producer, futures::future::join_all(workers));

        if let Some(e) = failure.lock().expect("failure mutex never poisoned").take() {
            return Err(e);
        }
        if self.cancellation.is_cancelled() {
            return Ok(());
        }

        if self.config.behavior.force_full_sync {
            let touched_ids: Vec<Uuid> = touched
                .lock()
                .expect("touched mutex never poisoned")
                .iter()
                .copied()
                .collect();
            let orphans = EntityStore::new(&self.pool)
                .find_orphans(self.sync_id, &touched_ids)
                .await?;
            if !orphans.is_empty() {
                self.dispatcher
                    .dispatch_orphan_cleanup(&orphans, self.sync_id)
                    .await?;
                tracker.record_many(Action::Deleted, "__orphan__", orphans.len() as u64);
            }
        }

        if !self.config.cursor.skip_updates {
            CursorStore::new(&self.pool)
                .save(self.sync_id, &self.source.current_cursor())
                .await?;
        }

        Ok(())
    }

    /// Streams the source into the bounded channel. Stops early (dropping
    /// `tx`, which unblocks any worker waiting on an empty channel) if
    /// cancellation fires mid-stream. Per-entity generation errors are
    /// logged and skipped rather than failing the whole producer (spec
    /// §4.8: "per-entity chunk/embed exceptions are skipped"; the same
    /// tolerance applies to a source's own per-item errors).
    async fn produce(&self, http: &mut RateLimitedHttpClient, cursor: Value, tx: mpsc::Sender<Entity>) {
        let mut stream = self.source.generate_entities(http, cursor);
        while let Some(item) = stream.next().await {
            if self.cancellation.is_cancelled() {
                break;
            }
            match item {
                Ok(entity) => {
                    if tx.send(entity).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "source generation error, entity skipped");
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn worker_loop(
        &self,
        rx: Arc<AsyncMutex<mpsc::Receiver<Entity>>>,
        snapshot: Arc<AsyncMutex<Vec<StoredEntityRecord>>>,
        touched: Arc<StdMutex<HashSet<Uuid>>>,
        tracker: Arc<Tracker>,
        state_publisher: Option<Arc<AsyncMutex<StatePublisher>>>,
        failure: Arc<StdMutex<Option<AirweaveError>>>,
    ) {
        loop {
            if self.cancellation.is_cancelled() {
                return;
            }

            let batch = {
                let mut rx = rx.lock().await;
                next_micro_batch(&mut rx, &self.batching).await
            };
            let Some(batch) = batch else { return };

            let mut groups: HashMap<String, Vec<Entity>> = HashMap::new();
            for entity in batch {
                groups
                    .entry(entity.entity_type_id().to_string())
                    .or_default()
                    .push(entity);
            }

            for (entity_type, group) in groups {
                if self.cancellation.is_cancelled() {
                    return;
                }

                let result = self
                    .process_group(&entity_type, group, &snapshot, &touched, &tracker)
                    .await;

                if let Err(e) = result {
                    warn!(error = %e, entity_type, "batch dispatch failed, stopping sync");
                    *failure.lock().expect("failure mutex never poisoned") = Some(e);
                    self.cancellation.cancel();
                    return;
                }

                if let Some(publisher) = &state_publisher {
                    let mut publisher = publisher.lock().await;
                    if let Err(e) = publisher.check_and_publish(&tracker).await {
                        warn!(error = %e, "progress publish failed");
                    }
                }
            }
        }
    }

    async fn process_group(
        &self,
        entity_type: &str,
        group: Vec<Entity>,
        snapshot: &Arc<AsyncMutex<Vec<StoredEntityRecord>>>,
        touched: &Arc<StdMutex<HashSet<Uuid>>>,
        tracker: &Arc<Tracker>,
    ) -> Result<()> {
        let action_batch = {
            let snapshot = snapshot.lock().await;
            resolve(&group, &snapshot, self.config.behavior.skip_hash_comparison)
        };

        if action_batch.total() == 0 {
            return Ok(());
        }

        // A chunk/embed failure only drops the offending entity (spec §4.8);
        // it must never abort the rest of the group. Dispatch failures below
        // are the opposite: they fail the whole batch.
        let mut skipped: u64 = 0;

        let mut inserts = Vec::with_capacity(action_batch.inserts.len());
        for resolved in &action_batch.inserts {
            let id = Uuid::new_v4();
            match prepare_entity(
                &self.chunker,
                &self.embedder,
                &resolved.entity,
                id,
                self.sync_id,
                self.collection_id,
            )
            .await
            {
                Ok(prepared) => inserts.push(PreparedInsert {
                    id,
                    entity: resolved.entity.clone(),
                    hash: prepared.hash,
                    vectors: prepared.vectors,
                    raw: prepared.raw,
                }),
                Err(e) => {
                    warn!(error = %e, entity_type, source_entity_id = resolved.entity.source_entity_id(), "entity failed to chunk/embed, skipped");
                    skipped += 1;
                }
            }
        }

        let mut updates = Vec::with_capacity(action_batch.updates.len());
        for resolved in &action_batch.updates {
            match prepare_entity(
                &self.chunker,
                &self.embedder,
                &resolved.entity,
                resolved.db_id,
                self.sync_id,
                self.collection_id,
            )
            .await
            {
                Ok(prepared) => updates.push(PreparedUpdate {
                    db_id: resolved.db_id,
                    entity: resolved.entity.clone(),
                    hash: prepared.hash,
                    vectors: prepared.vectors,
                    raw: prepared.raw,
                }),
                Err(e) => {
                    warn!(error = %e, entity_type, source_entity_id = resolved.entity.source_entity_id(), "entity failed to chunk/embed, skipped");
                    skipped += 1;
                }
            }
        }

        if inserts.is_empty() && updates.is_empty() && action_batch.keeps.is_empty() && action_batch.deletes.is_empty() {
            if skipped > 0 {
                tracker.record_many(Action::Skipped, entity_type, skipped);
            }
            return Ok(());
        }

        let dispatch_batch = DispatchBatch {
            sync_id: self.sync_id,
            organization_id: self.organization_id,
            collection_id: self.collection_id,
            source_entity_type: entity_type.to_string(),
            inserts,
            updates,
            keeps: action_batch.keeps.clone(),
            deletes: action_batch.deletes.clone(),
        };

        self.dispatcher.dispatch(&dispatch_batch).await?;

        {
            let mut touched = touched.lock().expect("touched mutex never poisoned");
            for insert in &dispatch_batch.inserts {
                touched.insert(insert.id);
            }
            for update in &dispatch_batch.updates {
                touched.insert(update.db_id);
            }
            for keep in &dispatch_batch.keeps {
                touched.insert(keep.db_id);
            }
        }

        {
            let mut snapshot = snapshot.lock().await;
            let delete_ids: HashSet<Uuid> = dispatch_batch.deletes.iter().map(|d| d.db_id).collect();
            snapshot.retain(|record| !delete_ids.contains(&record.db_id));
            for insert in &dispatch_batch.inserts {
                snapshot.push(StoredEntityRecord {
                    key: airweave_common::entity::EntityKey {
                        sync_id: self.sync_id,
                        source_entity_id: insert.entity.source_entity_id().to_string(),
                        entity_type_id: insert.entity.entity_type_id().to_string(),
                    },
                    db_id: insert.id,
                    hash: insert.hash.clone(),
                });
            }
            for update in &dispatch_batch.updates {
                if let Some(record) = snapshot.iter_mut().find(|r| r.db_id == update.db_id) {
                    record.hash = update.hash.clone();
                }
            }
        }

        tracker.record_many(Action::Inserted, entity_type, dispatch_batch.inserts.len() as u64);
        tracker.record_many(Action::Updated, entity_type, dispatch_batch.updates.len() as u64);
        tracker.record_many(Action::Deleted, entity_type, dispatch_batch.deletes.len() as u64);
        tracker.record_many(Action::Kept, entity_type, dispatch_batch.keeps.len() as u64);
        if skipped > 0 {
            tracker.record_many(Action::Skipped, entity_type, skipped);
        }

        Ok(())
    }
}

fn counters_from(tracker: &Tracker) -> JobCounters {
    let stats = tracker.stats();
    JobCounters {
        inserted: stats.inserted as i64,
        updated: stats.updated as i64,
        deleted: stats.deleted as i64,
        kept: stats.kept as i64,
        skipped: stats.skipped as i64,
    }
}

fn job_status(outcome: JobOutcome) -> JobStatus {
    match outcome {
        JobOutcome::Completed => JobStatus::Completed,
        JobOutcome::Failed => JobStatus::Failed,
        JobOutcome::Cancelled => JobStatus::Cancelled,
    }
}
