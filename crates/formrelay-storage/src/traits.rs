//! Document store abstraction trait
//!
//! This module defines the capability surface the pipeline depends on. The
//! core never talks to a specific provider's wire format; it only needs
//! find/create folder, upload, and a public-read grant.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use formrelay_core::models::{RemoteFolderRef, UploadedArtifact};

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Folder lookup failed: {0}")]
    FolderLookup(String),

    #[error("Folder creation failed: {0}")]
    FolderCreate(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Permission grant failed: {0}")]
    PermissionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid remote id: {0}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Remote document store capability.
///
/// The hierarchy is logically append-only from the pipeline's point of view:
/// folders are looked up or created, never deleted.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find a non-trashed folder named exactly `name` directly under
    /// `parent_id`. Returns the first match; duplicates are tolerated and
    /// first-result-wins.
    async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> StoreResult<Option<RemoteFolderRef>>;

    /// Create a folder named `name` under `parent_id` and return its
    /// reference.
    async fn create_folder(&self, name: &str, parent_id: &str) -> StoreResult<RemoteFolderRef>;

    /// Upload the file at `local_path` into `parent_id` under `remote_name`.
    async fn upload_file(
        &self,
        local_path: &Path,
        remote_name: &str,
        parent_id: &str,
    ) -> StoreResult<UploadedArtifact>;

    /// Make a previously uploaded file publicly readable.
    async fn grant_public_read(&self, file_id: &str) -> StoreResult<()>;
}
