//! The destination adapter contract (spec §4.5, C6).

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use airweave_common::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingRequirement {
    ChunksAndEmbeddings,
    #[default]
    RawEntities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    Hybrid,
    Neural,
    Keyword,
}

/// A sparse vector as `(index, value)` pairs, omitted entirely when a
/// destination or embedding model doesn't produce one (spec §4.3).
pub type SparseVector = Vec<(u32, f32)>;

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub sync_id: Uuid,
    pub collection_id: Uuid,
    pub dense: Vec<f32>,
    pub sparse: Option<SparseVector>,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: Uuid,
    pub sync_id: Uuid,
    pub collection_id: Uuid,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct TemporalConfig {
    pub weight: f32,
    pub timestamp_field: String,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub collection_id: Uuid,
    pub dense: Option<Vec<f32>>,
    pub sparse: Option<SparseVector>,
    pub query_text: Option<String>,
    pub limit: u32,
    pub offset: u32,
    /// Qdrant-shaped filter; non-Qdrant destinations translate internally
    /// (spec §4.5).
    pub filter: Option<Value>,
    pub strategy: SearchStrategy,
    pub temporal: Option<TemporalConfig>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entity_id: Uuid,
    pub score: f32,
    pub payload: Value,
}

/// A vector or raw-data sink a sync writes to (spec §4.5). Mirrors
/// `rootsignal_domains::entities::models::embedding::Embedding`'s upsert /
/// search shape, generalized from one fixed Postgres table to a trait any
/// backend can implement.
#[async_trait]
pub trait Destination: Send + Sync {
    fn processing_requirement(&self) -> ProcessingRequirement;

    fn has_keyword_index(&self) -> bool {
        false
    }

    async fn bulk_insert(&self, records: &[VectorRecord]) -> Result<()>;

    async fn bulk_insert_raw(&self, _records: &[RawRecord]) -> Result<()> {
        Ok(())
    }

    async fn bulk_delete(&self, entity_ids: &[Uuid], sync_id: Uuid) -> Result<()>;

    /// Deletes every chunk belonging to the given parent entity ids — the
    /// first half of an UPDATE's delete-then-insert (spec §4.7, §5
    /// ordering guarantee).
    async fn bulk_delete_by_parent_ids(&self, parent_ids: &[Uuid], sync_id: Uuid) -> Result<()>;

    async fn delete_by_sync_id(&self, sync_id: Uuid) -> Result<()>;

    async fn delete_by_collection_id(&self, collection_id: Uuid) -> Result<()>;

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>>;
}
