//! Formrelay Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared across all formrelay components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorMetadata, LogLevel};
pub use models::{
    CompressionMethod, CompressionResult, DeliveryResult, InputFile, RemoteFolderRef,
    SubmissionContext, UploadedArtifact,
};
