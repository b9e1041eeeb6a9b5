//! Caller-facing success response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body returned to the caller when a run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub files: ResponseFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFiles {
    pub original_pdf_url: String,
    pub pain_diagram_pdf_url: String,
    pub merged_pdf_url: String,
    /// Field name to comma-joined public URLs, matching the notification
    /// payload's flattening.
    pub images: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serializes_camel_case() {
        let response = SubmissionResponse {
            success: true,
            message: "All files uploaded and processed successfully".to_string(),
            files: ResponseFiles {
                original_pdf_url: "https://store.example/file/a".to_string(),
                pain_diagram_pdf_url: "https://store.example/file/b".to_string(),
                merged_pdf_url: "https://store.example/file/c".to_string(),
                images: BTreeMap::new(),
            },
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["files"]["originalPdfUrl"], "https://store.example/file/a");
        assert_eq!(value["files"]["painDiagramPdfUrl"], "https://store.example/file/b");
        assert_eq!(value["files"]["mergedPdfUrl"], "https://store.example/file/c");
    }
}
