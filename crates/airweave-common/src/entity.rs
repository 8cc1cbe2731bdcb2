//! The polymorphic entity model (spec §3, §9).
//!
//! The source system uses a subclass hierarchy with per-field annotations.
//! Re-architected here as tagged variants: one common record plus a
//! discriminator, with a static descriptor (`embeddable_fields`) per instance
//! rather than per-class annotations — entities reference their parents and
//! siblings by id string only, never by object reference, so archiving and
//! replaying a tree of entities never has to worry about cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Ordered ancestor descriptor, attached to an entity for navigation and
/// search display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
    pub entity_type: String,
}

/// The identity tuple that must be globally unique per sync (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub sync_id: uuid::Uuid,
    pub source_entity_id: String,
    pub entity_type_id: String,
}

/// Fields shared by every non-deletion entity variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCommon {
    pub source_entity_id: String,
    pub entity_type_id: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub display_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Free-form payload, shape defined per entity type.
    pub payload: serde_json::Value,
    /// Which top-level keys of `payload` contribute to the content hash and
    /// are fed into embeddable text. Spec §3: the same flag-set drives both.
    pub embeddable_fields: Vec<String>,
}

impl EntityCommon {
    pub fn key(&self, sync_id: uuid::Uuid) -> EntityKey {
        EntityKey {
            sync_id,
            source_entity_id: self.source_entity_id.clone(),
            entity_type_id: self.entity_type_id.clone(),
        }
    }

    /// Deterministic hash over `embeddable_fields` only. Changing a
    /// non-embeddable field never changes the hash (spec §3 invariant).
    pub fn content_hash(&self) -> String {
        content_hash(&self.payload, &self.embeddable_fields)
    }
}

/// Deterministic content hash over a canonical subset of a payload.
///
/// `serde_json::Value::Object` is backed by a `BTreeMap` in this workspace
/// (the `preserve_order` feature is never enabled), so key order in the
/// source payload never affects the hash — this is what makes
/// `hash(e) == hash(roundtrip_json(e))` hold regardless of how the payload
/// was produced or re-serialized.
pub fn content_hash(payload: &serde_json::Value, embeddable_fields: &[String]) -> String {
    let mut fields: Vec<&String> = embeddable_fields.iter().collect();
    fields.sort();

    let mut canonical = serde_json::Map::new();
    for field in fields {
        let value = payload.get(field).cloned().unwrap_or(serde_json::Value::Null);
        canonical.insert(field.clone(), value);
    }

    let bytes = serde_json::to_vec(&serde_json::Value::Object(canonical))
        .expect("canonical map always serializes");

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEntity {
    pub common: EntityCommon,
    pub textual_representation: String,
    /// Set when this chunk is one of several produced by splitting a parent.
    pub chunk_index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntity {
    pub common: EntityCommon,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    /// Only set after a successful download. A downstream stage that reaches
    /// a file entity without this set must fail the sync (spec §3) — see
    /// `FileEntity::require_local_path`.
    pub local_path: Option<PathBuf>,
}

impl FileEntity {
    /// Downstream code must call this before touching file bytes. Returns
    /// `AirweaveError::SyncFailure` (never panics) because a missing
    /// `local_path` here is a pipeline bug, not a recoverable per-entity
    /// condition — spec §3 says this must fail the sync.
    pub fn require_local_path(&self) -> crate::error::Result<&PathBuf> {
        self.local_path.as_ref().ok_or_else(|| {
            crate::error::AirweaveError::SyncFailure(format!(
                "file entity {} reached downstream processing without a local_path",
                self.common.source_entity_id
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailHeaders {
    pub message_id: String,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailEntity {
    pub chunk: ChunkEntity,
    pub headers: EmailHeaders,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFileEntity {
    pub file: FileEntity,
    pub repo: String,
    pub path: String,
    pub commit: String,
}

/// Carries the same `source_entity_id` as the entity (tree) it deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionSignal {
    pub source_entity_id: String,
    pub entity_type_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    Chunk(ChunkEntity),
    File(FileEntity),
    Email(EmailEntity),
    CodeFile(CodeFileEntity),
    Deletion(DeletionSignal),
}

impl Entity {
    pub fn source_entity_id(&self) -> &str {
        match self {
            Entity::Chunk(e) => &e.common.source_entity_id,
            Entity::File(e) => &e.common.source_entity_id,
            Entity::Email(e) => &e.chunk.common.source_entity_id,
            Entity::CodeFile(e) => &e.file.common.source_entity_id,
            Entity::Deletion(e) => &e.source_entity_id,
        }
    }

    pub fn entity_type_id(&self) -> &str {
        match self {
            Entity::Chunk(e) => &e.common.entity_type_id,
            Entity::File(e) => &e.common.entity_type_id,
            Entity::Email(e) => &e.chunk.common.entity_type_id,
            Entity::CodeFile(e) => &e.file.common.entity_type_id,
            Entity::Deletion(e) => &e.entity_type_id,
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Entity::Deletion(_))
    }

    /// `None` for deletion signals — they carry no content to hash.
    pub fn content_hash(&self) -> Option<String> {
        match self {
            Entity::Chunk(e) => Some(e.common.content_hash()),
            Entity::File(e) => Some(e.common.content_hash()),
            Entity::Email(e) => Some(e.chunk.common.content_hash()),
            Entity::CodeFile(e) => Some(e.file.common.content_hash()),
            Entity::Deletion(_) => None,
        }
    }

    /// Whether this entity carries chunkable/embeddable text (chunk & email
    /// entities). File and code-file entities are chunked after their bytes
    /// are extracted to text by a separate stage.
    pub fn textual_representation(&self) -> Option<&str> {
        match self {
            Entity::Chunk(e) => Some(&e.textual_representation),
            Entity::Email(e) => Some(&e.chunk.textual_representation),
            _ => None,
        }
    }

    /// `None` only for deletion signals, which carry no `EntityCommon`.
    pub fn common(&self) -> Option<&EntityCommon> {
        match self {
            Entity::Chunk(e) => Some(&e.common),
            Entity::File(e) => Some(&e.common),
            Entity::Email(e) => Some(&e.chunk.common),
            Entity::CodeFile(e) => Some(&e.file.common),
            Entity::Deletion(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(payload: serde_json::Value, fields: &[&str]) -> EntityCommon {
        EntityCommon {
            source_entity_id: "a".into(),
            entity_type_id: "doc".into(),
            breadcrumbs: vec![],
            display_name: "A".into(),
            created_at: None,
            updated_at: None,
            payload,
            embeddable_fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn hash_ignores_non_embeddable_fields() {
        let a = common(
            serde_json::json!({"title": "x", "internal_etag": "111"}),
            &["title"],
        );
        let b = common(
            serde_json::json!({"title": "x", "internal_etag": "222"}),
            &["title"],
        );
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_changes_with_embeddable_field() {
        let a = common(serde_json::json!({"title": "x"}), &["title"]);
        let b = common(serde_json::json!({"title": "y"}), &["title"]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_is_stable_under_json_roundtrip() {
        let original = common(
            serde_json::json!({"b": 2, "a": 1, "c": {"nested": true}}),
            &["a", "b", "c"],
        );
        let hash_before = original.content_hash();

        let roundtripped: EntityCommon =
            serde_json::from_str(&serde_json::to_string(&original).unwrap()).unwrap();
        assert_eq!(hash_before, roundtripped.content_hash());
    }

    #[test]
    fn file_entity_without_local_path_is_sync_failure() {
        let file = FileEntity {
            common: common(serde_json::json!({}), &[]),
            url: "https://example.com/f".into(),
            size: 10,
            mime_type: "text/plain".into(),
            local_path: None,
        };
        assert!(file.require_local_path().is_err());
    }
}
