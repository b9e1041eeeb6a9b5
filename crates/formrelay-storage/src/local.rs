//! Local filesystem document store backend.
//!
//! Development/test backend that mirrors the remote hierarchy under a base
//! directory. Remote ids are base-relative paths (`root` for the base
//! itself); public URLs are minted by joining the id onto a base URL.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;

use formrelay_core::models::{RemoteFolderRef, UploadedArtifact};

use crate::traits::{DocumentStore, StoreError, StoreResult};

/// Sentinel id for the hierarchy root.
pub const ROOT_ID: &str = "root";

pub struct LocalDriveStore {
    base_dir: PathBuf,
    base_url: String,
    public: Mutex<HashSet<String>>,
}

impl LocalDriveStore {
    /// Create a store rooted at `base_dir`; the directory is created if
    /// missing.
    pub async fn new(base_dir: impl Into<PathBuf>, base_url: String) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await.map_err(|e| {
            StoreError::FolderCreate(format!(
                "Failed to create store directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            base_dir,
            base_url,
            public: Mutex::new(HashSet::new()),
        })
    }

    /// Convert a remote id to a filesystem path, rejecting traversal
    /// sequences that could escape the base directory.
    fn id_to_path(&self, id: &str) -> StoreResult<PathBuf> {
        if id == ROOT_ID {
            return Ok(self.base_dir.clone());
        }
        if id.contains("..") || id.starts_with('/') {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.base_dir.join(id))
    }

    fn child_id(&self, parent_id: &str, name: &str) -> String {
        if parent_id == ROOT_ID {
            name.to_string()
        } else {
            format!("{parent_id}/{name}")
        }
    }

    fn public_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl DocumentStore for LocalDriveStore {
    async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> StoreResult<Option<RemoteFolderRef>> {
        let id = self.child_id(parent_id, name);
        let path = self.id_to_path(&id)?;

        let is_dir = fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        Ok(is_dir.then(|| RemoteFolderRef {
            id,
            name: name.to_string(),
        }))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> StoreResult<RemoteFolderRef> {
        let id = self.child_id(parent_id, name);
        let path = self.id_to_path(&id)?;

        fs::create_dir_all(&path).await.map_err(|e| {
            StoreError::FolderCreate(format!("{}: {}", path.display(), e))
        })?;

        tracing::info!(id = %id, path = %path.display(), "Local store folder created");
        Ok(RemoteFolderRef {
            id,
            name: name.to_string(),
        })
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        remote_name: &str,
        parent_id: &str,
    ) -> StoreResult<UploadedArtifact> {
        let id = self.child_id(parent_id, remote_name);
        let path = self.id_to_path(&id)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let start = std::time::Instant::now();
        let size = fs::copy(local_path, &path).await.map_err(|e| {
            StoreError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            id = %id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store upload successful"
        );

        Ok(UploadedArtifact {
            remote_id: id.clone(),
            public_url: self.public_url(&id),
            display_name: remote_name.to_string(),
        })
    }

    async fn grant_public_read(&self, file_id: &str) -> StoreResult<()> {
        let path = self.id_to_path(file_id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound(file_id.to_string()));
        }
        self.public.lock().unwrap().insert(file_id.to_string());
        Ok(())
    }
}
