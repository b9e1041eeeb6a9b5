//! Size-reduction cascade for paginated documents.
//!
//! A prioritized list of strategies is tried in order until one succeeds:
//! the external Ghostscript compressor (when installed), the raster
//! re-encoding strategy, and finally a basic re-serialization that always
//! succeeds but performs no real size reduction. The cascade never raises
//! past the terminal strategy unless the input document itself is unreadable.

mod basic;
mod ghostscript;
mod raster;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use formrelay_core::models::{CompressionMethod, CompressionResult};

pub use ghostscript::ghostscript_available;

/// Quality presets handed to the external compressor, mapped to decreasing
/// image DPI by the compressor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    #[default]
    Screen,
    Ebook,
    Printer,
    Prepress,
}

impl QualityPreset {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "screen" => Ok(QualityPreset::Screen),
            "ebook" => Ok(QualityPreset::Ebook),
            "printer" => Ok(QualityPreset::Printer),
            "prepress" => Ok(QualityPreset::Prepress),
            _ => Err(anyhow::anyhow!("Invalid quality preset: {}", s)),
        }
    }

    /// `-dPDFSETTINGS` value for the external compressor.
    pub fn gs_setting(self) -> &'static str {
        match self {
            QualityPreset::Screen => "/screen",
            QualityPreset::Ebook => "/ebook",
            QualityPreset::Printer => "/printer",
            QualityPreset::Prepress => "/prepress",
        }
    }
}

/// Per-call tuning for the cascade.
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    pub quality: QualityPreset,
    /// JPEG quality factor (0.0..=1.0) for the raster strategy.
    pub image_quality: f32,
    /// Whether the external compressor is attempted before the raster
    /// strategy. Whichever runs first, the other is the fallback.
    pub prefer_ghostscript: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Screen,
            image_quality: 0.3,
            prefer_ghostscript: true,
        }
    }
}

/// Raised only when every strategy in the cascade has failed, which means
/// the input document itself could not be read.
#[derive(Debug, Error)]
#[error("All compression strategies failed: {reason}")]
pub struct CompressionError {
    pub reason: String,
}

/// One way of shrinking a document. Strategies transform `input` into
/// `output` and leave size accounting to the cascade.
#[async_trait]
trait CompressionStrategy: Send + Sync {
    async fn run(&self, input: &Path, output: &Path, opts: &CompressionOptions) -> Result<()>;

    fn method(&self) -> CompressionMethod;
}

/// Ordered try-with-fallback over the closed strategy set.
#[derive(Default)]
pub struct CompressionCascade;

impl CompressionCascade {
    pub fn new() -> Self {
        Self
    }

    /// Shrink `input` into `output`. Tries the preferred strategy, then the
    /// other, then the basic terminal strategy. Only an unreadable input
    /// makes this return `Err`.
    pub async fn compress(
        &self,
        input: &Path,
        output: &Path,
        opts: &CompressionOptions,
    ) -> std::result::Result<CompressionResult, CompressionError> {
        let gs: Box<dyn CompressionStrategy> = Box::new(ghostscript::GhostscriptStrategy);
        let raster: Box<dyn CompressionStrategy> = Box::new(raster::RasterStrategy);
        let basic: Box<dyn CompressionStrategy> = Box::new(basic::BasicStrategy);

        let ordered = if opts.prefer_ghostscript {
            [gs, raster, basic]
        } else {
            [raster, gs, basic]
        };

        let mut last_error = String::new();
        for strategy in ordered {
            let method = strategy.method();
            match strategy.run(input, output, opts).await {
                Ok(()) => {
                    let result = self.measure(input, output, method).await.map_err(|e| {
                        CompressionError {
                            reason: e.to_string(),
                        }
                    })?;
                    tracing::info!(
                        input = %input.display(),
                        method = %method,
                        original_kb = result.original_size / 1024,
                        compressed_kb = result.compressed_size / 1024,
                        ratio_percent = result.ratio_percent,
                        "Compression complete"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        input = %input.display(),
                        method = %method,
                        error = %e,
                        "Compression strategy failed, falling back"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(CompressionError { reason: last_error })
    }

    async fn measure(
        &self,
        input: &Path,
        output: &Path,
        method: CompressionMethod,
    ) -> Result<CompressionResult> {
        let original_size = tokio::fs::metadata(input).await?.len();
        let compressed_size = tokio::fs::metadata(output).await?.len();
        // The basic strategy reports success=false: the call worked but no
        // real size reduction was attempted.
        let success = method != CompressionMethod::Basic;
        Ok(CompressionResult::new(
            success,
            original_size,
            compressed_size,
            method,
        ))
    }
}
