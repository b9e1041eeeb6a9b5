//! Basic re-serialization, the guaranteed-success terminal strategy.
//!
//! Re-writes the document with minimal internal restructuring and no image
//! recompression. Failing here means the input itself is unreadable, which
//! the cascade surfaces as a fatal precondition failure.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lopdf::Document;

use formrelay_core::models::CompressionMethod;

use super::{CompressionOptions, CompressionStrategy};

pub(super) struct BasicStrategy;

#[async_trait]
impl CompressionStrategy for BasicStrategy {
    async fn run(&self, input: &Path, output: &Path, _opts: &CompressionOptions) -> Result<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let mut doc = Document::load_mem(&bytes)
                .map_err(|e| anyhow!("Failed to parse {}: {}", input.display(), e))?;

            doc.compress();
            doc.prune_objects();

            let mut out = Vec::new();
            doc.save_to(&mut out)
                .map_err(|e| anyhow!("Failed to serialize document: {}", e))?;
            std::fs::write(&output, out)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            Ok(())
        })
        .await
        .context("Basic compression task panicked")?
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Basic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::page_count;
    use crate::test_support::build_text_pdf;

    #[tokio::test]
    async fn test_basic_round_trips_any_valid_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("text.pdf");
        tokio::fs::write(&input, build_text_pdf(4)).await.unwrap();
        let output = dir.path().join("out.pdf");

        BasicStrategy
            .run(&input, &output, &CompressionOptions::default())
            .await
            .unwrap();

        let rebuilt = tokio::fs::read(&output).await.unwrap();
        assert_eq!(page_count(&rebuilt).unwrap(), 4);
    }

    #[tokio::test]
    async fn test_basic_rejects_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.pdf");
        tokio::fs::write(&input, b"garbage").await.unwrap();

        let result = BasicStrategy
            .run(
                &input,
                &dir.path().join("out.pdf"),
                &CompressionOptions::default(),
            )
            .await;
        assert!(result.is_err());
    }
}
