//! The dispatch-ready action batch (spec §4.6, §4.7): the resolver's
//! [`airweave_resolver::ActionBatch`] with chunking and embedding already
//! applied, so every handler — destination, archive, metadata — can act on
//! it without knowing anything about chunkers or embedders.

use uuid::Uuid;

use airweave_common::entity::Entity;
use airweave_destinations::{RawRecord, VectorRecord};
use airweave_resolver::{ResolvedDelete, ResolvedKeep};

/// A brand-new entity. `id` is allocated by the caller (not the metadata
/// store) so destination records can carry it as `parent_id` before the
/// metadata row exists (spec §4.7 ordering guarantee).
#[derive(Debug, Clone)]
pub struct PreparedInsert {
    pub id: Uuid,
    pub entity: Entity,
    pub hash: String,
    pub vectors: Vec<VectorRecord>,
    pub raw: Option<RawRecord>,
}

/// An entity whose hash changed. Destinations delete the old chunks by
/// `db_id` (the parent id) before inserting the new ones.
#[derive(Debug, Clone)]
pub struct PreparedUpdate {
    pub db_id: Uuid,
    pub entity: Entity,
    pub hash: String,
    pub vectors: Vec<VectorRecord>,
    pub raw: Option<RawRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchBatch {
    pub sync_id: Uuid,
    pub organization_id: Uuid,
    pub collection_id: Uuid,
    pub source_entity_type: String,
    pub inserts: Vec<PreparedInsert>,
    pub updates: Vec<PreparedUpdate>,
    pub keeps: Vec<ResolvedKeep>,
    pub deletes: Vec<ResolvedDelete>,
}

impl DispatchBatch {
    pub fn has_mutations(&self) -> bool {
        !self.inserts.is_empty() || !self.updates.is_empty() || !self.deletes.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} inserts, {} updates, {} keeps, {} deletes",
            self.inserts.len(),
            self.updates.len(),
            self.keeps.len(),
            self.deletes.len()
        )
    }
}
