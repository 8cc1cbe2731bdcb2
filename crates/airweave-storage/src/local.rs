//! Local-filesystem storage backend — development, single-pod deployments,
//! or a PVC-mounted volume in Kubernetes (spec §4.2).

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::path::sanitize;
use crate::{AirweaveError, Result, StorageBackend};

pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sanitize every path segment independently so a forbidden character in
    /// one segment can't smuggle a path traversal into another.
    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                continue;
            }
            full.push(sanitize(segment));
        }
        full
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn read_json(&self, path: &str) -> Result<Value> {
        let full = self.resolve(path);
        let bytes = tokio::fs::read(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AirweaveError::NotFound(path.to_string())
            } else {
                AirweaveError::Storage(e)
            }
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AirweaveError::Validation(format!("invalid JSON at {path}: {e}")))
    }

    async fn write_json(&self, path: &str, value: &Value) -> Result<()> {
        let full = self.resolve(path);
        Self::ensure_parent(&full).await?;
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| AirweaveError::Validation(e.to_string()))?;
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        tokio::fs::read(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AirweaveError::NotFound(path.to_string())
            } else {
                AirweaveError::Storage(e)
            }
        })
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        Self::ensure_parent(&full).await?;
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
        let base = self.resolve(prefix);
        if !base.exists() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let relative = path
                        .strip_prefix(&self.root)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .replace(std::path::MAIN_SEPARATOR, "/");
                    out.push(relative);
                }
            }
        }
        out.sort();
        Ok(out)
    }

    fn local_fs_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.resolve(path))
    }

    async fn delete_path(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        if full.is_dir() {
            match tokio::fs::remove_dir_all(&full).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AirweaveError::Storage(e)),
            }
        } else {
            match tokio::fs::remove_file(&full).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AirweaveError::Storage(e)),
            }
        }
    }
}
