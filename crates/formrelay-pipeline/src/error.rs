//! Pipeline error taxonomy.
//!
//! Every fatal error aborts the remaining stages but still runs cleanup.
//! User-visible failure is a single structured message; provider error
//! bodies stay in the logs.

use serde::Serialize;
use thiserror::Error;

use formrelay_core::{ErrorMetadata, LogLevel};
use formrelay_processing::MergeError;

use crate::stage::Stage;

/// Which required parts were present, echoed back on validation failure so
/// the caller can see exactly what was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReceivedDiagnostics {
    #[serde(rename_all = "camelCase")]
    Files { pdf: bool, pain_diagram: bool },
    #[serde(rename_all = "camelCase")]
    Identity {
        first_name: bool,
        last_name: bool,
        email: bool,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{message}")]
    Validation {
        message: String,
        received: ReceivedDiagnostics,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Folder resolution failed: {0}")]
    FolderResolution(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stage at which this error aborts the run.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation { .. } => Stage::Validating,
            PipelineError::Merge(_) => Stage::Merging,
            PipelineError::Compression(_) => Stage::Compressing,
            PipelineError::FolderResolution(_) => Stage::ResolvingNamespace,
            PipelineError::Upload(_) => Stage::Uploading,
            // Staging I/O can fail while persisting the merged artifact.
            PipelineError::Io(_) => Stage::Merging,
        }
    }

    /// Caller-facing response body. Validation failures carry the
    /// `received` diagnostic map; everything else is a bare failure message.
    pub fn response_body(&self) -> serde_json::Value {
        match self {
            PipelineError::Validation { message, received } => serde_json::json!({
                "message": message,
                "received": received,
            }),
            other => serde_json::json!({
                "success": false,
                "message": other.to_string(),
            }),
        }
    }
}

impl ErrorMetadata for PipelineError {
    fn http_status_code(&self) -> u16 {
        match self {
            PipelineError::Validation { .. } => 400,
            _ => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Validation { .. } => "VALIDATION_ERROR",
            PipelineError::Merge(_) => "MERGE_ERROR",
            PipelineError::Compression(_) => "COMPRESSION_ERROR",
            PipelineError::FolderResolution(_) => "FOLDER_RESOLUTION_ERROR",
            PipelineError::Upload(_) => "UPLOAD_ERROR",
            PipelineError::Io(_) => "IO_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Remote-side failures may succeed on resubmission; validation and
        // corrupt-input failures will not.
        matches!(
            self,
            PipelineError::FolderResolution(_) | PipelineError::Upload(_)
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::Validation { .. } => LogLevel::Debug,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_body_carries_received_map() {
        let err = PipelineError::Validation {
            message: "Both PDF and pain diagram are required.".to_string(),
            received: ReceivedDiagnostics::Files {
                pdf: true,
                pain_diagram: false,
            },
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.stage(), Stage::Validating);

        let body = err.response_body();
        assert_eq!(body["received"]["pdf"], true);
        assert_eq!(body["received"]["painDiagram"], false);
        assert!(body.get("success").is_none());
    }

    #[test]
    fn test_identity_diagnostics_serialize_camel_case() {
        let received = ReceivedDiagnostics::Identity {
            first_name: true,
            last_name: false,
            email: true,
        };
        let value = serde_json::to_value(received).unwrap();
        assert_eq!(value["firstName"], true);
        assert_eq!(value["lastName"], false);
        assert_eq!(value["email"], true);
    }

    #[test]
    fn test_fatal_errors_map_to_500() {
        let err = PipelineError::Upload("remote refused".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.stage(), Stage::Uploading);

        let body = err.response_body();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("remote refused"));
    }

    #[test]
    fn test_error_metadata_surface() {
        let upload = PipelineError::Upload("timeout".to_string());
        assert_eq!(upload.error_code(), "UPLOAD_ERROR");
        assert!(upload.is_recoverable());
        assert_eq!(upload.log_level(), LogLevel::Error);

        let validation = PipelineError::Validation {
            message: "missing".to_string(),
            received: ReceivedDiagnostics::Files {
                pdf: false,
                pain_diagram: false,
            },
        };
        assert_eq!(validation.error_code(), "VALIDATION_ERROR");
        assert!(!validation.is_recoverable());
        assert_eq!(validation.log_level(), LogLevel::Debug);
    }
}
