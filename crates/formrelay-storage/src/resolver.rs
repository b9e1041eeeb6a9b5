//! Namespace resolution: human-readable folder paths to stable remote ids.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use formrelay_core::models::RemoteFolderRef;

use crate::traits::{DocumentStore, StoreResult};

/// Find-else-create folder resolution with a per-run cache.
///
/// The cache guarantees at most one remote create per distinct
/// (parent, name) pair resolved through this instance, which is what lets the
/// orchestrator resolve a field's subfolder once and fan out uploads into it.
/// Two truly concurrent first resolutions of the same pair can still race to
/// a duplicate folder on the remote side; that race is accepted and not
/// guarded with remote locking.
pub struct NamespaceResolver {
    store: Arc<dyn DocumentStore>,
    cache: Mutex<HashMap<(String, String), RemoteFolderRef>>,
}

impl NamespaceResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the folder named `name` under `parent_id`, creating it if
    /// missing. Idempotent: repeated calls return the same reference without
    /// touching the remote side again.
    pub async fn resolve(&self, name: &str, parent_id: &str) -> StoreResult<RemoteFolderRef> {
        let key = (parent_id.to_string(), name.to_string());

        if let Some(found) = self.cache.lock().await.get(&key) {
            return Ok(found.clone());
        }

        let folder = match self.store.find_folder(name, parent_id).await? {
            Some(existing) => existing,
            None => {
                let created = self.store.create_folder(name, parent_id).await?;
                tracing::info!(name = %name, parent_id = %parent_id, id = %created.id, "Created remote folder");
                created
            }
        };

        self.cache.lock().await.insert(key, folder.clone());
        Ok(folder)
    }

    /// Walk `segments` left to right under `root_id`, resolving each level,
    /// and return the leaf folder.
    pub async fn resolve_path(
        &self,
        segments: &[&str],
        root_id: &str,
    ) -> StoreResult<RemoteFolderRef> {
        let mut current = RemoteFolderRef {
            id: root_id.to_string(),
            name: String::new(),
        };
        for segment in segments {
            current = self.resolve(segment, &current.id).await?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let resolver = NamespaceResolver::new(store.clone());

        let first = resolver.resolve("Images", "root").await.unwrap();
        let second = resolver.resolve("Images", "root").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.create_folder_calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_finds_existing_folder() {
        let store = Arc::new(MemoryStore::new());
        let existing = store.create_folder("Jane Doe", "root").await.unwrap();

        let resolver = NamespaceResolver::new(store.clone());
        let resolved = resolver.resolve("Jane Doe", "root").await.unwrap();

        assert_eq!(resolved.id, existing.id);
        assert_eq!(store.create_folder_calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_path_walks_segments() {
        let store = Arc::new(MemoryStore::new());
        let resolver = NamespaceResolver::new(store.clone());

        let leaf = resolver
            .resolve_path(&["Jane Doe", "Images", "front id"], "root")
            .await
            .unwrap();

        assert_eq!(leaf.name, "front id");
        assert_eq!(store.create_folder_calls(), 3);

        // Resolving the same path again creates nothing new.
        let again = resolver
            .resolve_path(&["Jane Doe", "Images", "front id"], "root")
            .await
            .unwrap();
        assert_eq!(again.id, leaf.id);
        assert_eq!(store.create_folder_calls(), 3);
    }

    #[tokio::test]
    async fn test_same_name_under_different_parents() {
        let store = Arc::new(MemoryStore::new());
        let resolver = NamespaceResolver::new(store.clone());

        let a = resolver.resolve("Images", "root").await.unwrap();
        let b = resolver.resolve("Sub", &a.id).await.unwrap();
        let c = resolver.resolve("Images", &b.id).await.unwrap();

        assert_ne!(a.id, c.id);
        assert_eq!(store.create_folder_calls(), 3);
    }
}
