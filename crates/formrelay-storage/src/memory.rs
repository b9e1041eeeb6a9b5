//! In-memory document store backend.
//!
//! Test double for the pipeline: keeps the folder tree and uploaded files in
//! memory, counts capability calls, and supports failure injection so
//! orchestrator error paths can be exercised without a real remote.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use formrelay_core::models::{RemoteFolderRef, UploadedArtifact};

use crate::traits::{DocumentStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct FolderNode {
    name: String,
    parent_id: String,
}

/// One file recorded by the store, exposed for test assertions.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub size_bytes: u64,
}

#[derive(Default)]
struct State {
    folders: HashMap<String, FolderNode>,
    files: Vec<StoredFile>,
    public: HashSet<String>,
}

/// In-memory [`DocumentStore`] with call counters and failure injection.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    find_folder_calls: AtomicUsize,
    create_folder_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_folder_ops: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail with `StoreError::UploadFailed`.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent folder lookup/create fail.
    pub fn fail_folder_ops(&self, fail: bool) {
        self.fail_folder_ops.store(fail, Ordering::SeqCst);
    }

    pub fn find_folder_calls(&self) -> usize {
        self.find_folder_calls.load(Ordering::SeqCst)
    }

    pub fn create_folder_calls(&self) -> usize {
        self.create_folder_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Total number of remote calls observed, across all capabilities.
    pub fn total_calls(&self) -> usize {
        self.find_folder_calls() + self.create_folder_calls() + self.upload_calls()
    }

    pub fn uploaded_files(&self) -> Vec<StoredFile> {
        self.state.lock().unwrap().files.clone()
    }

    pub fn is_public(&self, file_id: &str) -> bool {
        self.state.lock().unwrap().public.contains(file_id)
    }

    /// Resolve a folder path from the root for assertions; returns `None` if
    /// any segment is missing.
    pub fn folder_by_path(&self, segments: &[&str]) -> Option<RemoteFolderRef> {
        let state = self.state.lock().unwrap();
        let mut current = "root".to_string();
        let mut name = String::new();
        for segment in segments {
            let (id, node) = state
                .folders
                .iter()
                .find(|(_, node)| node.parent_id == current && node.name == *segment)?;
            current = id.clone();
            name = node.name.clone();
        }
        Some(RemoteFolderRef { id: current, name })
    }

    /// Names of direct child folders under `parent_id`.
    pub fn child_folder_names(&self, parent_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .folders
            .values()
            .filter(|node| node.parent_id == parent_id)
            .map(|node| node.name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> StoreResult<Option<RemoteFolderRef>> {
        self.find_folder_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_folder_ops.load(Ordering::SeqCst) {
            return Err(StoreError::FolderLookup("injected failure".to_string()));
        }

        let state = self.state.lock().unwrap();
        let found = state
            .folders
            .iter()
            .find(|(_, node)| node.parent_id == parent_id && node.name == name)
            .map(|(id, node)| RemoteFolderRef {
                id: id.clone(),
                name: node.name.clone(),
            });
        Ok(found)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> StoreResult<RemoteFolderRef> {
        self.create_folder_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_folder_ops.load(Ordering::SeqCst) {
            return Err(StoreError::FolderCreate("injected failure".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        self.state.lock().unwrap().folders.insert(
            id.clone(),
            FolderNode {
                name: name.to_string(),
                parent_id: parent_id.to_string(),
            },
        );
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
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::UploadFailed("injected failure".to_string()));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StoreError::UploadFailed(format!("{}: {}", local_path.display(), e)))?;

        let id = Uuid::new_v4().to_string();
        let public_url = format!("https://store.example/file/{id}");
        self.state.lock().unwrap().files.push(StoredFile {
            id: id.clone(),
            name: remote_name.to_string(),
            parent_id: parent_id.to_string(),
            size_bytes: data.len() as u64,
        });

        Ok(UploadedArtifact {
            remote_id: id,
            public_url,
            display_name: remote_name.to_string(),
        })
    }

    async fn grant_public_read(&self, file_id: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.files.iter().any(|f| f.id == file_id) {
            return Err(StoreError::NotFound(file_id.to_string()));
        }
        state.public.insert(file_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_then_create_round_trip() {
        let store = MemoryStore::new();
        assert!(store.find_folder("Images", "root").await.unwrap().is_none());

        let created = store.create_folder("Images", "root").await.unwrap();
        let found = store.find_folder("Images", "root").await.unwrap().unwrap();
        assert_eq!(created.id, found.id);
    }

    #[tokio::test]
    async fn test_upload_records_file_and_permission() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        tokio::fs::write(&path, b"%PDF-1.4 test").await.unwrap();

        let store = MemoryStore::new();
        let artifact = store.upload_file(&path, "doc.pdf", "root").await.unwrap();
        assert!(!store.is_public(&artifact.remote_id));

        store.grant_public_read(&artifact.remote_id).await.unwrap();
        assert!(store.is_public(&artifact.remote_id));

        let files = store.uploaded_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "doc.pdf");
        assert_eq!(files[0].size_bytes, 13);
    }

    #[tokio::test]
    async fn test_injected_upload_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        tokio::fs::write(&path, b"x").await.unwrap();

        let store = MemoryStore::new();
        store.fail_uploads(true);
        let result = store.upload_file(&path, "doc.pdf", "root").await;
        assert!(matches!(result, Err(StoreError::UploadFailed(_))));
    }
}
