use serde::{Deserialize, Serialize};

/// Which cascade strategy produced a compressed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    Ghostscript,
    Raster,
    Basic,
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::Ghostscript => write!(f, "ghostscript"),
            CompressionMethod::Raster => write!(f, "raster"),
            CompressionMethod::Basic => write!(f, "basic"),
        }
    }
}

/// Outcome of one cascade invocation. Produced once per input document and
/// never mutated afterwards.
///
/// `success` is `false` only for the basic terminal strategy, signalling that
/// no real size reduction was attempted even though the call returned `Ok`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    pub success: bool,
    pub original_size: u64,
    pub compressed_size: u64,
    /// `(original - compressed) / original * 100`, rounded to two decimals.
    /// Negative when compression inflates the document; reported as-is.
    pub ratio_percent: f64,
    pub method: CompressionMethod,
}

impl CompressionResult {
    pub fn new(
        success: bool,
        original_size: u64,
        compressed_size: u64,
        method: CompressionMethod,
    ) -> Self {
        Self {
            success,
            original_size,
            compressed_size,
            ratio_percent: compression_ratio(original_size, compressed_size),
            method,
        }
    }
}

/// `(original - compressed) / original * 100`, rounded to two decimals.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio =
        (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// A node in the remote folder hierarchy, looked up or created by the
/// namespace resolver. Never duplicated for the same (parent, name) pair
/// within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolderRef {
    pub id: String,
    pub name: String,
}

/// One file that made it into the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedArtifact {
    pub remote_id: String,
    pub public_url: String,
    pub display_name: String,
}

/// Aggregate outcome of the Uploading stage.
///
/// `images_by_field` preserves field arrival order, and arrival order of
/// files within each field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub original_doc: UploadedArtifact,
    pub diagram_doc: UploadedArtifact,
    pub merged_doc: UploadedArtifact,
    pub images_by_field: Vec<(String, Vec<UploadedArtifact>)>,
}

impl DeliveryResult {
    /// Per-field image URLs flattened to one comma-joined string each.
    ///
    /// The downstream consumer only accepts scalar values per field, so an
    /// array of URLs is deliberately collapsed to `"url1, url2"`. Keep this
    /// quirk; it is part of the external contract, not a serialization
    /// convenience.
    pub fn comma_joined_images(&self) -> std::collections::BTreeMap<String, String> {
        self.images_by_field
            .iter()
            .map(|(field, artifacts)| {
                let joined = artifacts
                    .iter()
                    .map(|a| a.public_url.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                (field.clone(), joined)
            })
            .collect()
    }
}
