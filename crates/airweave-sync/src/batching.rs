//! Micro-batch accumulation over a bounded channel (spec §4.8, §5): a
//! producer streams entities into a bounded `mpsc` channel, and each worker
//! accumulates a local batch until it hits the size cap or the latency cap,
//! whichever comes first.

use std::time::Duration;

use airweave_common::entity::Entity;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_WORKER_COUNT: usize = 20;
pub const DEFAULT_MICRO_BATCH_SIZE: usize = 64;
pub const DEFAULT_MICRO_BATCH_LATENCY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub struct BatchingConfig {
    pub queue_capacity: usize,
    pub worker_count: usize,
    pub micro_batch_size: usize,
    pub micro_batch_latency: Duration,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            micro_batch_size: DEFAULT_MICRO_BATCH_SIZE,
            micro_batch_latency: DEFAULT_MICRO_BATCH_LATENCY,
        }
    }
}

impl BatchingConfig {
    /// Reads `worker_count` from `AIRWEAVE_SYNC_WORKERS` if set (spec §5:
    /// "env-tunable"), otherwise keeps the default. Other fields are not
    /// exposed as env vars since nothing in the spec calls for tuning them
    /// independently.
    pub fn from_env() -> Self {
        let worker_count = std::env::var("AIRWEAVE_SYNC_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_WORKER_COUNT);
        Self {
            worker_count,
            ..Self::default()
        }
    }
}

/// Pulls entities off `rx` until either `micro_batch_size` items have
/// accumulated or `micro_batch_latency` has elapsed since the first item of
/// this batch arrived. Returns `None` only when the channel is closed and
/// nothing more was collected — the caller treats that as end-of-stream.
pub async fn next_micro_batch(
    rx: &mut tokio::sync::mpsc::Receiver<Entity>,
    config: &BatchingConfig,
) -> Option<Vec<Entity>> {
    let first = rx.recv().await?;
    let mut batch = Vec::with_capacity(config.micro_batch_size);
    batch.push(first);

    let deadline = tokio::time::Instant::now() + config.micro_batch_latency;
    while batch.len() < config.micro_batch_size {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(entity)) => batch.push(entity),
            Ok(None) => break,
            Err(_) => break,
        }
    }

    Some(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use airweave_common::entity::{ChunkEntity, EntityCommon};

    fn entity(id: &str) -> Entity {
        Entity::Chunk(ChunkEntity {
            common: EntityCommon {
                source_entity_id: id.into(),
                entity_type_id: "doc".into(),
                breadcrumbs: vec![],
                display_name: id.into(),
                created_at: None,
                updated_at: None,
                payload: serde_json::json!({}),
                embeddable_fields: vec![],
            },
            textual_representation: "x".into(),
            chunk_index: None,
        })
    }

    #[tokio::test]
    async fn flushes_at_the_size_cap_without_waiting_for_the_latency_cap() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(10);
        for i in 0..5 {
            tx.send(entity(&i.to_string())).await.unwrap();
        }
        let config = BatchingConfig {
            micro_batch_size: 5,
            micro_batch_latency: Duration::from_secs(30),
            ..BatchingConfig::default()
        };

        let batch = next_micro_batch(&mut rx, &config).await.unwrap();
        assert_eq!(batch.len(), 5);
    }

    #[tokio::test]
    async fn flushes_at_the_latency_cap_with_a_partial_batch() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(10);
        tx.send(entity("only")).await.unwrap();
        let config = BatchingConfig {
            micro_batch_size: 64,
            micro_batch_latency: Duration::from_millis(30),
            ..BatchingConfig::default()
        };

        let batch = next_micro_batch(&mut rx, &config).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn closed_empty_channel_yields_none() {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Entity>(10);
        drop(tx);
        let config = BatchingConfig::default();
        assert!(next_micro_batch(&mut rx, &config).await.is_none());
    }
}
