//! Formrelay Processing Library
//!
//! Document transforms for the ingestion pipeline: PDF merging and the
//! size-reduction cascade (external compressor, page-raster re-encoding,
//! basic re-serialization).

pub mod compression;
pub mod merge;
pub mod test_support;

// Re-export commonly used types
pub use compression::{
    CompressionCascade, CompressionError, CompressionOptions, QualityPreset,
};
pub use merge::{merge, page_count, MergeError};
