//! Storage abstraction (spec §4.2 / C2): read/write entity archives and
//! attachments on local filesystem or an object-store-shaped backend.
//!
//! Grounded on the teacher workspace's filesystem-first storage convention
//! (a single abstract backend trait, a local-disk implementation usable in
//! development and behind a PVC in production) and on
//! `examples/original_source/backend/airweave/platform/storage/storage_client.py`,
//! which this module's `read_json`/`write_json`/`read_file`/`write_file`
//! naming follows directly.

pub mod local;
pub mod path;

use async_trait::async_trait;
use serde_json::Value;

pub use airweave_common::error::{AirweaveError, Result};

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read_json(&self, path: &str) -> Result<Value>;
    async fn write_json(&self, path: &str, value: &Value) -> Result<()>;
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &str, bytes: &[u8]) -> Result<()>;
    async fn list_files(&self, prefix: &str) -> Result<Vec<String>>;
    async fn delete_path(&self, path: &str) -> Result<()>;

    /// Root under which a sync job's temp files live, so cleanup is a single
    /// rm-tree (spec §4.2).
    fn temp_root(&self, sync_job_id: &str) -> String {
        format!("tmp/{sync_job_id}")
    }

    /// Absolute filesystem path backing `path`, for callers that must hand a
    /// real path to code outside this abstraction (e.g. a downstream file
    /// reader). Backends with no local filesystem return `None`.
    fn local_fs_path(&self, _path: &str) -> Option<std::path::PathBuf> {
        None
    }

    async fn cleanup_temp(&self, sync_job_id: &str) -> Result<()> {
        self.delete_path(&self.temp_root(sync_job_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStorage;

    #[tokio::test]
    async fn not_found_is_distinguishable_from_other_errors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let err = storage.read_json("missing.json").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn round_trips_json_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let value = serde_json::json!({"a": 1});
        storage.write_json("entities/x.json", &value).await.unwrap();
        assert_eq!(storage.read_json("entities/x.json").await.unwrap(), value);

        storage.write_file("files/x.bin", b"hello").await.unwrap();
        assert_eq!(storage.read_file("files/x.bin").await.unwrap(), b"hello");

        let listed = storage.list_files("entities").await.unwrap();
        assert_eq!(listed, vec!["entities/x.json".to_string()]);
    }

    #[tokio::test]
    async fn cleanup_temp_removes_everything_under_the_sync_job_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .write_file(&format!("{}/a.bin", storage.temp_root("job-1")), b"x")
            .await
            .unwrap();
        storage
            .write_file(&format!("{}/nested/b.bin", storage.temp_root("job-1")), b"y")
            .await
            .unwrap();

        storage.cleanup_temp("job-1").await.unwrap();

        assert!(storage.list_files("tmp/job-1").await.unwrap().is_empty());
    }
}
