//! Writes entity JSON (plus any referenced file) into the ARF layout
//! (spec §3, §4.10, §6):
//!
//! ```text
//! raw/{sync_id}/manifest.json
//! raw/{sync_id}/entities/{safe_entity_id}.json
//! raw/{sync_id}/files/{safe_entity_id}_{safe_name}.{ext}
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use airweave_common::entity::Entity;
use airweave_common::error::{AirweaveError, Result};
use airweave_storage::path::sanitize;
use airweave_storage::StorageBackend;

use crate::manifest::Manifest;

pub struct ArchiveWriter {
    storage: Arc<dyn StorageBackend>,
}

fn entities_path(sync_id: Uuid, safe_entity_id: &str) -> String {
    format!("raw/{sync_id}/entities/{safe_entity_id}.json")
}

fn manifest_path(sync_id: Uuid) -> String {
    format!("raw/{sync_id}/manifest.json")
}

impl ArchiveWriter {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn load_manifest(&self, sync_id: Uuid) -> Result<Option<Manifest>> {
        match self.storage.read_json(&manifest_path(sync_id)).await {
            Ok(value) => Ok(Some(serde_json::from_value(value).map_err(|e| {
                AirweaveError::SyncFailure(format!("corrupt archive manifest: {e}"))
            })?)),
            Err(e) if e.kind() == "not_found" => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        let value = serde_json::to_value(manifest)
            .map_err(|e| AirweaveError::SyncFailure(format!("invalid manifest: {e}")))?;
        self.storage.write_json(&manifest_path(manifest.sync_id), &value).await
    }

    pub async fn ensure_manifest(
        &self,
        sync_id: Uuid,
        source_short_name: &str,
        collection_id: Uuid,
    ) -> Result<Manifest> {
        if let Some(manifest) = self.load_manifest(sync_id).await? {
            return Ok(manifest);
        }
        let manifest = Manifest::new(sync_id, source_short_name, collection_id);
        self.save_manifest(&manifest).await?;
        Ok(manifest)
    }

    /// Writes one entity's JSON envelope (plus its file bytes, if it's a
    /// file entity with a `local_path`). Idempotent — writing the same
    /// entity twice just overwrites both blobs (spec §4.7).
    pub async fn write_entity(&self, sync_id: Uuid, entity: &Entity) -> Result<()> {
        let safe_entity_id = sanitize(entity.source_entity_id());
        let mut payload = entity_payload(entity);

        if let Some(local_path) = file_local_path(entity) {
            let bytes = tokio::fs::read(local_path).await.map_err(AirweaveError::Storage)?;
            let original_name = local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "blob".into());
            let safe_name = sanitize(&original_name);
            let file_path = format!("raw/{sync_id}/files/{safe_entity_id}_{safe_name}");
            self.storage.write_file(&file_path, &bytes).await?;
            payload
                .as_object_mut()
                .expect("entity_payload always returns an object")
                .insert("__stored_file__".into(), json!(file_path));
        }

        self.storage
            .write_json(&entities_path(sync_id, &safe_entity_id), &payload)
            .await
    }

    pub async fn list_entity_ids(&self, sync_id: Uuid) -> Result<Vec<String>> {
        let prefix = format!("raw/{sync_id}/entities");
        let paths = self.storage.list_files(&prefix).await?;
        Ok(paths
            .into_iter()
            .filter_map(|p| {
                p.rsplit('/')
                    .next()
                    .and_then(|f| f.strip_suffix(".json"))
                    .map(str::to_string)
            })
            .collect())
    }

    pub async fn read_entity_json(&self, sync_id: Uuid, safe_entity_id: &str) -> Result<Value> {
        self.storage.read_json(&entities_path(sync_id, safe_entity_id)).await
    }

    pub async fn read_file(&self, relative_path: &str) -> Result<Vec<u8>> {
        self.storage.read_file(relative_path).await
    }

    pub async fn delete_sync(&self, sync_id: Uuid) -> Result<()> {
        self.storage.delete_path(&format!("raw/{sync_id}")).await
    }
}

/// Builds the entity envelope: three reserved keys plus the entity's own
/// serialized fields (spec §6). `__stored_file__` is added by the caller
/// once the referenced file, if any, has actually been copied in.
fn entity_payload(entity: &Entity) -> Value {
    let mut value = serde_json::to_value(entity).expect("Entity always serializes");
    let obj = value.as_object_mut().expect("tagged enum serializes as an object");

    obj.insert("__entity_class__".into(), json!(entity_class(entity)));
    obj.insert("__entity_module__".into(), json!("airweave.entities"));
    obj.insert("__captured_at__".into(), json!(Utc::now().to_rfc3339()));

    value
}

/// `Some` when this entity carries a downloaded file that needs archiving
/// alongside its JSON (spec §3: file and code-file entities only).
fn file_local_path(entity: &Entity) -> Option<&std::path::Path> {
    match entity {
        Entity::File(e) => e.local_path.as_deref(),
        Entity::CodeFile(e) => e.file.local_path.as_deref(),
        _ => None,
    }
}

fn entity_class(entity: &Entity) -> &'static str {
    match entity {
        Entity::Chunk(_) => "ChunkEntity",
        Entity::File(_) => "FileEntity",
        Entity::Email(_) => "EmailEntity",
        Entity::CodeFile(_) => "CodeFileEntity",
        Entity::Deletion(_) => "DeletionSignal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airweave_common::entity::{ChunkEntity, EntityCommon};
    use airweave_storage::local::LocalStorage;

    fn chunk() -> Entity {
        Entity::Chunk(ChunkEntity {
            common: EntityCommon {
                source_entity_id: "doc-1".into(),
                entity_type_id: "doc".into(),
                breadcrumbs: vec![],
                display_name: "Doc 1".into(),
                created_at: None,
                updated_at: None,
                payload: json!({"text": "hi"}),
                embeddable_fields: vec!["text".into()],
            },
            textual_representation: "hi".into(),
            chunk_index: None,
        })
    }

    #[tokio::test]
    async fn write_entity_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(dir.path()));
        let writer = ArchiveWriter::new(storage);
        let sync_id = Uuid::new_v4();

        writer.write_entity(sync_id, &chunk()).await.unwrap();
        writer.write_entity(sync_id, &chunk()).await.unwrap();

        let ids = writer.list_entity_ids(sync_id).await.unwrap();
        assert_eq!(ids, vec!["doc-1".to_string()]);
    }

    #[tokio::test]
    async fn written_entity_carries_reserved_envelope_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(dir.path()));
        let writer = ArchiveWriter::new(storage);
        let sync_id = Uuid::new_v4();

        writer.write_entity(sync_id, &chunk()).await.unwrap();
        let value = writer.read_entity_json(sync_id, "doc-1").await.unwrap();

        assert!(value.get("__entity_class__").is_some());
        assert!(value.get("__entity_module__").is_some());
        assert!(value.get("__captured_at__").is_some());
    }
}
