//! Replays an archived sync as an ordinary `Source`, bypassing the upstream
//! API entirely (spec §4.10). Used to rebuild a destination slot from the
//! archive instead of re-crawling (spec §4.9 resync-from-source).

use std::path::PathBuf;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use airweave_common::entity::{CodeFileEntity, Entity, FileEntity};
use airweave_common::error::{AirweaveError, Result};
use airweave_sources::{EntityStream, RateLimitedHttpClient, Source, SourceMetadata};
use airweave_storage::StorageBackend;

use crate::writer::ArchiveWriter;

/// A pseudo-source that reads entities back out of a previously archived
/// sync rather than contacting any upstream API.
pub struct ReplaySource {
    writer: ArchiveWriter,
    storage: Arc<dyn StorageBackend>,
    sync_id: Uuid,
    source_short_name: &'static str,
}

impl ReplaySource {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        sync_id: Uuid,
        source_short_name: &'static str,
    ) -> Self {
        Self {
            writer: ArchiveWriter::new(storage.clone()),
            storage,
            sync_id,
            source_short_name,
        }
    }

    fn temp_root(&self) -> String {
        self.storage.temp_root(&format!("replay-{}", self.sync_id))
    }

    /// Restores a file entity's archived blob to a local temp path and
    /// rewrites `local_path` to point at it, so downstream chunking code
    /// sees the same shape it would for a freshly downloaded file.
    async fn restore_file(&self, stored_file: &str, file_name: &str) -> Result<PathBuf> {
        let bytes = self.writer.read_file(stored_file).await?;
        let dest = format!("{}/{file_name}", self.temp_root());
        self.storage.write_file(&dest, &bytes).await?;

        // `dest` is relative to the backend's own root, not the process
        // CWD; resolve it to a real filesystem path before handing it to
        // downstream readers (e.g. `ArchiveWriter` re-reading it off disk).
        self.storage.local_fs_path(&dest).ok_or_else(|| {
            AirweaveError::Storage(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("storage backend has no local filesystem path for {dest}"),
            ))
        })
    }
}

#[async_trait]
impl Source for ReplaySource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            short_name: self.source_short_name,
            display_name: "Replay",
            auth_methods: vec![],
            oauth_type: None,
            labels: vec!["replay"],
            supports_continuous: false,
        }
    }

    fn generate_entities<'a>(
        &'a self,
        _http: &'a mut RateLimitedHttpClient,
        _cursor: Value,
    ) -> EntityStream<'a> {
        self.replay_entities()
    }
}

impl ReplaySource {
    /// Streams the archived entities directly, with no `RateLimitedHttpClient`
    /// needed — replay never touches the network. The `Source` impl above
    /// exists only so a replay can be dropped into ordinary sync plumbing;
    /// callers that just want the archive back can use this directly.
    pub fn replay_entities(&self) -> EntityStream<'_> {
        Box::pin(try_stream! {
            let entity_ids = self.writer.list_entity_ids(self.sync_id).await?;
            for safe_entity_id in entity_ids {
                let mut value = self.writer.read_entity_json(self.sync_id, &safe_entity_id).await?;
                let stored_file = value
                    .as_object_mut()
                    .and_then(|obj| obj.remove("__stored_file__"))
                    .and_then(|v| v.as_str().map(str::to_string));

                let mut entity: Entity = serde_json::from_value(value).map_err(|e| {
                    AirweaveError::SyncFailure(format!(
                        "archived entity {safe_entity_id} failed to deserialize: {e}"
                    ))
                })?;

                if let Some(stored_file) = stored_file {
                    let file_name = stored_file
                        .rsplit('/')
                        .next()
                        .unwrap_or(&stored_file)
                        .to_string();
                    let local_path = self.restore_file(&stored_file, &file_name).await?;
                    match &mut entity {
                        Entity::File(FileEntity { local_path: lp, .. }) => *lp = Some(local_path),
                        Entity::CodeFile(CodeFileEntity { file, .. }) => {
                            file.local_path = Some(local_path)
                        }
                        _ => {}
                    }
                }

                yield entity;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airweave_common::entity::{ChunkEntity, EntityCommon};
    use airweave_storage::local::LocalStorage;
    use futures::StreamExt;
    use serde_json::json;

    fn chunk(id: &str) -> Entity {
        Entity::Chunk(ChunkEntity {
            common: EntityCommon {
                source_entity_id: id.into(),
                entity_type_id: "doc".into(),
                breadcrumbs: vec![],
                display_name: id.into(),
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
    async fn replays_every_archived_entity() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(dir.path()));
        let writer = ArchiveWriter::new(storage.clone());
        let sync_id = Uuid::new_v4();

        writer.write_entity(sync_id, &chunk("a")).await.unwrap();
        writer.write_entity(sync_id, &chunk("b")).await.unwrap();

        let replay = ReplaySource::new(storage, sync_id, "replay");
        let stream = replay.replay_entities();
        let entities: Vec<Entity> = stream.map(|r| r.unwrap()).collect().await;

        let mut ids: Vec<&str> = entities.iter().map(|e| e.source_entity_id()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
