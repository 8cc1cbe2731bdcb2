//! The action resolver (spec §4.6, C7): a single pass over an incoming
//! batch, diffed against the metadata store's last-seen hashes, producing
//! one action per entity.

use std::collections::HashMap;

use uuid::Uuid;

use airweave_common::entity::{Entity, EntityKey};
use airweave_common::stored_entity::StoredEntityRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LookupKey {
    source_entity_id: String,
    entity_type_id: String,
}

impl From<&EntityKey> for LookupKey {
    fn from(k: &EntityKey) -> Self {
        Self {
            source_entity_id: k.source_entity_id.clone(),
            entity_type_id: k.entity_type_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedInsert {
    pub entity: Entity,
}

#[derive(Debug, Clone)]
pub struct ResolvedUpdate {
    pub entity: Entity,
    pub db_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedKeep {
    pub db_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedDelete {
    pub db_id: Uuid,
}

/// Per-action-type output (spec §4.6). Chunking of insert/update items
/// happens downstream, after resolution, so this batch still carries whole
/// entities rather than chunks.
#[derive(Debug, Clone, Default)]
pub struct ActionBatch {
    pub inserts: Vec<ResolvedInsert>,
    pub updates: Vec<ResolvedUpdate>,
    pub keeps: Vec<ResolvedKeep>,
    pub deletes: Vec<ResolvedDelete>,
}

impl ActionBatch {
    pub fn total(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.keeps.len() + self.deletes.len()
    }
}

/// Resolves one batch against the current metadata-store rows for the
/// `(sync_id, source_entity_id, entity_type_id)` keys it touches.
///
/// `skip_hash_comparison` forces every non-deletion entity to `INSERT`
/// (spec §4.6, `behavior.skip_hash_comparison`) — used by replay jobs that
/// intentionally re-populate a destination from scratch.
pub fn resolve(
    batch: &[Entity],
    existing: &[StoredEntityRecord],
    skip_hash_comparison: bool,
) -> ActionBatch {
    let by_key: HashMap<LookupKey, &StoredEntityRecord> = existing
        .iter()
        .map(|record| (LookupKey::from(&record.key), record))
        .collect();

    let mut result = ActionBatch::default();

    for entity in batch {
        let lookup = LookupKey {
            source_entity_id: entity.source_entity_id().to_string(),
            entity_type_id: entity.entity_type_id().to_string(),
        };

        if entity.is_deletion() {
            if let Some(record) = by_key.get(&lookup) {
                result.deletes.push(ResolvedDelete { db_id: record.db_id });
            }
            // A deletion signal for an entity we never stored is a no-op:
            // there is nothing to delete (spec §4.6).
            continue;
        }

        let existing_record = by_key.get(&lookup);

        if skip_hash_comparison {
            result.inserts.push(ResolvedInsert {
                entity: entity.clone(),
            });
            continue;
        }

        match existing_record {
            None => result.inserts.push(ResolvedInsert {
                entity: entity.clone(),
            }),
            Some(record) => {
                let current_hash = entity
                    .content_hash()
                    .expect("non-deletion entities always hash");
                if current_hash == record.hash {
                    result.keeps.push(ResolvedKeep { db_id: record.db_id });
                } else {
                    result.updates.push(ResolvedUpdate {
                        entity: entity.clone(),
                        db_id: record.db_id,
                    });
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use airweave_common::entity::{ChunkEntity, DeletionSignal, EntityCommon};

    fn chunk_entity(id: &str, payload: serde_json::Value) -> Entity {
        Entity::Chunk(ChunkEntity {
            common: EntityCommon {
                source_entity_id: id.into(),
                entity_type_id: "doc".into(),
                breadcrumbs: vec![],
                display_name: id.into(),
                created_at: None,
                updated_at: None,
                payload,
                embeddable_fields: vec!["text".into()],
            },
            textual_representation: "x".into(),
            chunk_index: None,
        })
    }

    fn stored(sync_id: uuid::Uuid, id: &str, hash: &str) -> StoredEntityRecord {
        StoredEntityRecord {
            key: EntityKey {
                sync_id,
                source_entity_id: id.into(),
                entity_type_id: "doc".into(),
            },
            db_id: Uuid::new_v4(),
            hash: hash.into(),
        }
    }

    #[test]
    fn new_entity_is_inserted() {
        let entity = chunk_entity("a", serde_json::json!({"text": "hi"}));
        let batch = resolve(&[entity], &[], false);
        assert_eq!(batch.inserts.len(), 1);
        assert_eq!(batch.total(), 1);
    }

    #[test]
    fn unchanged_hash_is_kept() {
        let sync_id = uuid::Uuid::new_v4();
        let entity = chunk_entity("a", serde_json::json!({"text": "hi"}));
        let hash = entity.content_hash().unwrap();
        let batch = resolve(&[entity], &[stored(sync_id, "a", &hash)], false);
        assert_eq!(batch.keeps.len(), 1);
    }

    #[test]
    fn changed_hash_is_updated() {
        let sync_id = uuid::Uuid::new_v4();
        let entity = chunk_entity("a", serde_json::json!({"text": "hi"}));
        let batch = resolve(&[entity], &[stored(sync_id, "a", "stale-hash")], false);
        assert_eq!(batch.updates.len(), 1);
    }

    #[test]
    fn deletion_signal_deletes_known_entity() {
        let sync_id = uuid::Uuid::new_v4();
        let deletion = Entity::Deletion(DeletionSignal {
            source_entity_id: "a".into(),
            entity_type_id: "doc".into(),
        });
        let batch = resolve(&[deletion], &[stored(sync_id, "a", "h")], false);
        assert_eq!(batch.deletes.len(), 1);
    }

    #[test]
    fn deletion_signal_for_unknown_entity_is_a_no_op() {
        let deletion = Entity::Deletion(DeletionSignal {
            source_entity_id: "ghost".into(),
            entity_type_id: "doc".into(),
        });
        let batch = resolve(&[deletion], &[], false);
        assert_eq!(batch.total(), 0);
    }

    #[test]
    fn skip_hash_comparison_forces_insert_even_when_unchanged() {
        let sync_id = uuid::Uuid::new_v4();
        let entity = chunk_entity("a", serde_json::json!({"text": "hi"}));
        let hash = entity.content_hash().unwrap();
        let batch = resolve(&[entity], &[stored(sync_id, "a", &hash)], true);
        assert_eq!(batch.inserts.len(), 1);
        assert_eq!(batch.keeps.len(), 0);
    }

    proptest::proptest! {
        #[test]
        fn every_entity_maps_to_exactly_one_action(
            ids in proptest::collection::vec("[a-z]{1,8}", 1..20),
            force_insert: bool,
        ) {
            let entities: Vec<Entity> = ids
                .iter()
                .map(|id| chunk_entity(id, serde_json::json!({"text": id})))
                .collect();
            let batch = resolve(&entities, &[], force_insert);
            prop_assert_eq!(batch.total(), entities.len());
        }
    }
}
