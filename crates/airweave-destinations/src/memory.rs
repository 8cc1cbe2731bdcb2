//! An in-process destination, used by the archive-only / replay-only sync
//! presets and by tests that would otherwise need a live Postgres or vector
//! engine.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use airweave_common::error::Result;

use crate::destination::{
    Destination, ProcessingRequirement, RawRecord, SearchHit, SearchRequest, VectorRecord,
};

#[derive(Default)]
pub struct InMemoryDestination {
    requirement: ProcessingRequirement,
    vectors: Mutex<HashMap<Uuid, VectorRecord>>,
    raw: Mutex<HashMap<Uuid, RawRecord>>,
}

impl InMemoryDestination {
    pub fn new(requirement: ProcessingRequirement) -> Self {
        Self {
            requirement,
            vectors: Mutex::new(HashMap::new()),
            raw: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.lock().len() + self.raw.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Destination for InMemoryDestination {
    fn processing_requirement(&self) -> ProcessingRequirement {
        self.requirement
    }

    async fn bulk_insert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut vectors = self.vectors.lock();
        for record in records {
            vectors.insert(record.id, record.clone());
        }
        Ok(())
    }

    async fn bulk_insert_raw(&self, records: &[RawRecord]) -> Result<()> {
        let mut raw = self.raw.lock();
        for record in records {
            raw.insert(record.id, record.clone());
        }
        Ok(())
    }

    async fn bulk_delete(&self, entity_ids: &[Uuid], sync_id: Uuid) -> Result<()> {
        let ids: std::collections::HashSet<_> = entity_ids.iter().copied().collect();
        self.vectors
            .lock()
            .retain(|_, r| !(r.sync_id == sync_id && ids.contains(&r.id)));
        self.raw
            .lock()
            .retain(|_, r| !(r.sync_id == sync_id && ids.contains(&r.id)));
        Ok(())
    }

    async fn bulk_delete_by_parent_ids(&self, parent_ids: &[Uuid], sync_id: Uuid) -> Result<()> {
        let ids: std::collections::HashSet<_> = parent_ids.iter().copied().collect();
        self.vectors.lock().retain(|_, r| {
            !(r.sync_id == sync_id && r.parent_id.map(|p| ids.contains(&p)).unwrap_or(false))
        });
        Ok(())
    }

    async fn delete_by_sync_id(&self, sync_id: Uuid) -> Result<()> {
        self.vectors.lock().retain(|_, r| r.sync_id != sync_id);
        self.raw.lock().retain(|_, r| r.sync_id != sync_id);
        Ok(())
    }

    async fn delete_by_collection_id(&self, collection_id: Uuid) -> Result<()> {
        self.vectors
            .lock()
            .retain(|_, r| r.collection_id != collection_id);
        self.raw
            .lock()
            .retain(|_, r| r.collection_id != collection_id);
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let vectors = self.vectors.lock();
        let mut hits: Vec<SearchHit> = vectors
            .values()
            .filter(|r| r.collection_id == request.collection_id)
            .map(|r| SearchHit {
                entity_id: r.id,
                score: 1.0,
                payload: r.payload.clone(),
            })
            .collect();
        hits.truncate(request.limit as usize);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(sync_id: Uuid, collection_id: Uuid) -> VectorRecord {
        VectorRecord {
            id: Uuid::new_v4(),
            parent_id: None,
            sync_id,
            collection_id,
            dense: vec![0.1, 0.2],
            sparse: None,
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn delete_by_sync_id_removes_only_that_syncs_rows() {
        let dest = InMemoryDestination::new(ProcessingRequirement::ChunksAndEmbeddings);
        let sync_a = Uuid::new_v4();
        let sync_b = Uuid::new_v4();
        let collection = Uuid::new_v4();

        dest.bulk_insert(&[record(sync_a, collection), record(sync_b, collection)])
            .await
            .unwrap();
        assert_eq!(dest.len(), 2);

        dest.delete_by_sync_id(sync_a).await.unwrap();
        assert_eq!(dest.len(), 1);
    }
}
