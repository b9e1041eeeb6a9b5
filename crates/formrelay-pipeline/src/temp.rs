//! Local staging file tracking.
//!
//! Every transient path a run creates (or takes ownership of) is registered
//! here; `cleanup` removes whatever still exists. The orchestrator calls it
//! on every exit path, so no early return can leak staging files.

use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct TempSet {
    paths: Vec<PathBuf>,
}

impl TempSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a path for end-of-run removal. Registering a path that never
    /// gets created is fine; cleanup skips what does not exist.
    pub fn register(&mut self, path: impl AsRef<Path>) {
        self.paths.push(path.as_ref().to_path_buf());
    }

    /// Remove every tracked file that still exists. Removal failures are
    /// logged, never propagated; cleanup must not mask the run's outcome.
    pub async fn cleanup(&self) {
        for path in &self.paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging file");
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.paths.len()
    }
}
