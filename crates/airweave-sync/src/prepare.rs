//! Turns a resolved insert/update into dispatch-ready vector and raw
//! records (spec §4.6→§4.7 handoff): chunk the entity's text, embed each
//! chunk, and stamp every record with the parent id the dispatcher already
//! allocated.

use std::sync::Arc;

use uuid::Uuid;

use airweave_chunking::chunker::Chunker;
use airweave_chunking::embedder::Embedder;
use airweave_common::entity::Entity;
use airweave_common::error::{AirweaveError, Result};
use airweave_destinations::{RawRecord, VectorRecord};

pub struct Prepared {
    pub hash: String,
    pub vectors: Vec<VectorRecord>,
    pub raw: Option<RawRecord>,
}

/// Chunking is CPU-bound (BPE encode/decode over potentially long text), so
/// it runs on the blocking pool; embedding is a network call and stays on
/// the async task.
pub async fn prepare_entity(
    chunker: &Arc<dyn Chunker>,
    embedder: &Arc<dyn Embedder>,
    entity: &Entity,
    id: Uuid,
    sync_id: Uuid,
    collection_id: Uuid,
) -> Result<Prepared> {
    let hash = entity
        .content_hash()
        .expect("insert/update entities always carry a content hash");

    let chunks = match (entity.common(), entity.textual_representation()) {
        (Some(common), Some(text)) => {
            let chunker = chunker.clone();
            let common = common.clone();
            let text = text.to_string();
            tokio::task::spawn_blocking(move || chunker.chunk(&common, &text))
                .await
                .map_err(|e| AirweaveError::SyncFailure(format!("chunking task panicked: {e}")))?
        }
        // File and code-file entities without extracted text are archived
        // and metadata-tracked but never vectorized.
        _ => Vec::new(),
    };

    let texts: Vec<String> = chunks
        .iter()
        .map(|c| c.textual_representation.clone())
        .collect();

    let (dense, sparse) = if texts.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let dense = embedder.embed_dense(&texts).await?;
        let sparse = embedder.embed_sparse(&texts).await.unwrap_or_default();
        (dense, sparse)
    };

    let vectors = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| VectorRecord {
            id: Uuid::new_v4(),
            parent_id: Some(id),
            sync_id,
            collection_id,
            dense: dense.get(i).cloned().unwrap_or_default(),
            sparse: sparse.get(i).cloned().flatten(),
            payload: serde_json::to_value(chunk).unwrap_or(serde_json::Value::Null),
        })
        .collect();

    let raw = Some(RawRecord {
        id,
        sync_id,
        collection_id,
        payload: serde_json::to_value(entity).unwrap_or(serde_json::Value::Null),
    });

    Ok(Prepared { hash, vectors, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use airweave_chunking::embedder::DeterministicEmbedder;
    use airweave_common::entity::{ChunkEntity, EntityCommon, FileEntity};

    fn chunk_entity(text: &str) -> Entity {
        Entity::Chunk(ChunkEntity {
            common: EntityCommon {
                source_entity_id: "a".into(),
                entity_type_id: "doc".into(),
                breadcrumbs: vec![],
                display_name: "A".into(),
                created_at: None,
                updated_at: None,
                payload: serde_json::json!({ "text": text }),
                embeddable_fields: vec!["text".into()],
            },
            textual_representation: text.into(),
            chunk_index: None,
        })
    }

    struct SingleWindowChunker;
    impl Chunker for SingleWindowChunker {
        fn chunk(&self, common: &EntityCommon, text: &str) -> Vec<ChunkEntity> {
            vec![ChunkEntity {
                common: common.clone(),
                textual_representation: text.to_string(),
                chunk_index: Some(0),
            }]
        }
    }

    #[tokio::test]
    async fn textual_entity_produces_one_vector_and_a_raw_record() {
        let chunker: Arc<dyn Chunker> = Arc::new(SingleWindowChunker);
        let embedder: Arc<dyn Embedder> = Arc::new(DeterministicEmbedder::new(8));
        let entity = chunk_entity("hello world");
        let id = Uuid::new_v4();
        let sync_id = Uuid::new_v4();
        let collection_id = Uuid::new_v4();

        let prepared = prepare_entity(&chunker, &embedder, &entity, id, sync_id, collection_id)
            .await
            .unwrap();

        assert_eq!(prepared.vectors.len(), 1);
        assert_eq!(prepared.vectors[0].parent_id, Some(id));
        assert!(prepared.raw.is_some());
    }

    #[tokio::test]
    async fn file_entity_without_text_produces_no_vectors() {
        let chunker: Arc<dyn Chunker> = Arc::new(SingleWindowChunker);
        let embedder: Arc<dyn Embedder> = Arc::new(DeterministicEmbedder::new(8));
        let entity = Entity::File(FileEntity {
            common: EntityCommon {
                source_entity_id: "f".into(),
                entity_type_id: "file".into(),
                breadcrumbs: vec![],
                display_name: "F".into(),
                created_at: None,
                updated_at: None,
                payload: serde_json::json!({}),
                embeddable_fields: vec![],
            },
            url: "https://example.com/f".into(),
            size: 1,
            mime_type: "application/octet-stream".into(),
            local_path: None,
        });
        let id = Uuid::new_v4();

        let prepared = prepare_entity(
            &chunker,
            &embedder,
            &entity,
            id,
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        assert!(prepared.vectors.is_empty());
        assert!(prepared.raw.is_some());
    }
}
