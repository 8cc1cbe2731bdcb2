//! Redis pubsub snapshot publisher (spec §4.11), ported from
//! `platform/sync/state_publisher.py`'s `SyncStatePublisher`: a progress
//! snapshot to `sync_job`, a per-type breakdown to `sync_job_state`, both
//! throttled to fire every `publish_threshold` operations.

use std::collections::HashMap;

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

use crate::tracker::{Stats, Tracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStatus {
    Completed,
    Failed,
    Cancelled,
}

impl FinalStatus {
    fn as_str(self) -> &'static str {
        match self {
            FinalStatus::Completed => "completed",
            FinalStatus::Failed => "failed",
            FinalStatus::Cancelled => "cancelled",
        }
    }
}

/// `job_status` while a sync is still running, published on every progress
/// snapshot (spec §6, §4.11).
const JOB_STATUS_RUNNING: &str = "running";

#[derive(Debug, Serialize)]
struct ProgressMessage {
    inserted: u64,
    updated: u64,
    deleted: u64,
    kept: u64,
    skipped: u64,
    last_update_timestamp: String,
    /// Only set on the terminal publish; `None` (omitted on the wire would
    /// still serialize as `null`, which is what a consumer expects to see
    /// for every non-terminal snapshot).
    status: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct StateMessage<'a> {
    job_id: Uuid,
    sync_id: Uuid,
    entity_counts: &'a HashMap<String, u64>,
    total_entities: u64,
    job_status: &'static str,
    error: Option<&'a str>,
}

/// Publishes `Tracker` snapshots to Redis pubsub, throttled by operation
/// count rather than wall-clock time (spec §4.11: "every N operations").
pub struct StatePublisher {
    redis: ConnectionManager,
    job_id: Uuid,
    sync_id: Uuid,
    publish_threshold: u64,
    last_published_ops: u64,
}

impl StatePublisher {
    pub fn new(redis: ConnectionManager, job_id: Uuid, sync_id: Uuid, publish_threshold: u64) -> Self {
        Self {
            redis,
            job_id,
            sync_id,
            publish_threshold,
            last_published_ops: 0,
        }
    }

    /// Publishes a snapshot if at least `publish_threshold` operations have
    /// happened since the last publish. No-op otherwise.
    pub async fn check_and_publish(&mut self, tracker: &Tracker) -> Result<()> {
        let total_ops = tracker.total_operations();
        if total_ops.saturating_sub(self.last_published_ops) < self.publish_threshold {
            return Ok(());
        }
        self.publish_progress(tracker).await?;
        self.last_published_ops = total_ops;
        Ok(())
    }

    pub async fn publish_progress(&mut self, tracker: &Tracker) -> Result<()> {
        let stats = tracker.stats();
        self.publish_stats(&stats, None).await?;
        self.publish_state(tracker, None, None).await
    }

    pub async fn publish_completion(
        &mut self,
        tracker: &Tracker,
        status: FinalStatus,
        error: Option<&str>,
    ) -> Result<()> {
        self.publish_stats(&tracker.stats(), Some(status)).await?;
        self.publish_state(tracker, Some(status), error).await
    }

    async fn publish_stats(&mut self, stats: &Stats, final_status: Option<FinalStatus>) -> Result<()> {
        let message = ProgressMessage {
            inserted: stats.inserted,
            updated: stats.updated,
            deleted: stats.deleted,
            kept: stats.kept,
            skipped: stats.skipped,
            last_update_timestamp: Utc::now().to_rfc3339(),
            status: final_status.map(FinalStatus::as_str),
        };
        self.publish("sync_job", &message).await
    }

    async fn publish_state(
        &mut self,
        tracker: &Tracker,
        final_status: Option<FinalStatus>,
        error: Option<&str>,
    ) -> Result<()> {
        let entity_counts = tracker.named_counts();
        let job_status = final_status.map(FinalStatus::as_str).unwrap_or(JOB_STATUS_RUNNING);
        let message = StateMessage {
            job_id: self.job_id,
            sync_id: self.sync_id,
            entity_counts: &entity_counts,
            total_entities: tracker.total_entities(),
            job_status,
            error,
        };
        self.publish("sync_job_state", &message).await
    }

    async fn publish<T: Serialize>(&mut self, channel: &str, message: &T) -> Result<()> {
        let payload = serde_json::to_string(message)
            .map_err(|e| AirweaveError::Validation(format!("invalid pubsub payload: {e}")))?;
        let channel_key = format!("{channel}:{}", self.job_id);

        match self.redis.publish::<_, _, ()>(&channel_key, payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, channel = channel_key, "failed to publish sync state");
                Ok(())
            }
        }
    }
}
