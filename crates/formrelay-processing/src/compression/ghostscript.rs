//! External Ghostscript compression strategy.
//!
//! The binary is probed once per process over a fixed candidate list; if
//! nothing answers `--version`, the strategy stays unavailable for the
//! process lifetime and is never re-probed per call.

use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use formrelay_core::models::CompressionMethod;

use super::{CompressionOptions, CompressionStrategy};

const CANDIDATES: &[&str] = &[
    "gs",
    "/usr/bin/gs",
    "/usr/local/bin/gs",
    "gswin64c",
    r"C:\Program Files\gs\gs10.05.1\bin\gswin64c.exe",
];

static GHOSTSCRIPT: OnceLock<Option<String>> = OnceLock::new();

fn detect() -> Option<&'static str> {
    GHOSTSCRIPT
        .get_or_init(|| {
            for candidate in CANDIDATES {
                let responds = std::process::Command::new(candidate)
                    .arg("--version")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .map(|s| s.success())
                    .unwrap_or(false);
                if responds {
                    tracing::info!(path = %candidate, "Found Ghostscript");
                    return Some(candidate.to_string());
                }
            }
            tracing::warn!("Ghostscript not found, raster compression will be used");
            None
        })
        .as_deref()
}

/// Whether the external compressor is available in this process.
pub fn ghostscript_available() -> bool {
    detect().is_some()
}

pub(super) struct GhostscriptStrategy;

#[async_trait]
impl CompressionStrategy for GhostscriptStrategy {
    async fn run(&self, input: &Path, output: &Path, opts: &CompressionOptions) -> Result<()> {
        let gs = detect().ok_or_else(|| anyhow!("Ghostscript not available"))?;

        let status = Command::new(gs)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS={}", opts.quality.gs_setting()))
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-dBATCH")
            .arg("-dColorImageDownsampleType=/Bicubic")
            .arg("-dColorImageResolution=150")
            .arg("-dGrayImageDownsampleType=/Bicubic")
            .arg("-dGrayImageResolution=150")
            .arg("-dMonoImageDownsampleType=/Bicubic")
            .arg("-dMonoImageResolution=150")
            .arg(format!("-sOutputFile={}", output.display()))
            .arg(input)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .context("Failed to spawn Ghostscript")?;

        if !status.success() {
            return Err(anyhow!("Ghostscript exited with {}", status));
        }
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(anyhow!("Ghostscript produced no output file"));
        }
        Ok(())
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Ghostscript
    }
}
