//! The metadata store's view of an entity (spec §3 "Stored entity"),
//! decoupled from `sqlx` so the action resolver (C7) doesn't need a database
//! dependency to reason about hashes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityKey;

/// One row per `(sync_id, source_entity_id, entity_type_id)`: the last-seen
/// content hash plus the database id needed for bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntityRecord {
    pub key: EntityKey,
    pub db_id: Uuid,
    pub hash: String,
}
