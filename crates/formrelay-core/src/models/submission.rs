use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One uploaded file as handed over by the ingestion layer.
///
/// Created by the upload-receiving layer, owned by the orchestrator for the
/// duration of one run, never persisted past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFile {
    pub field_name: String,
    pub original_name: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
}

/// Submitter identity plus the run's timestamp token.
///
/// Identity fields are trimmed on construction and guaranteed non-empty; the
/// token is derived once per run and shared by every artifact name.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub timestamp_token: String,
}

impl SubmissionContext {
    /// Build a context from raw form values. Returns `None` if any identity
    /// field is empty after trimming; callers turn that into a validation
    /// failure before any processing begins.
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Option<Self> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        let email = email.trim();
        if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
            return None;
        }
        Some(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            timestamp_token: timestamp_token(Local::now()),
        })
    }

    /// `First Last`, the name of the per-submitter remote folder.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn original_doc_name(&self) -> String {
        format!(
            "Original_Form_{}_{}_{}.pdf",
            self.first_name, self.last_name, self.timestamp_token
        )
    }

    pub fn diagram_doc_name(&self) -> String {
        format!(
            "Pain_Diagram_{}_{}_{}.pdf",
            self.first_name, self.last_name, self.timestamp_token
        )
    }

    pub fn merged_doc_name(&self) -> String {
        format!(
            "Merged_Patient_Form_{}_{}_{}.pdf",
            self.first_name, self.last_name, self.timestamp_token
        )
    }
}

/// Collision-resistant token: month-day-year plus 12-hour clock time,
/// e.g. `08-06-2026_03-07PM`.
fn timestamp_token<Tz: chrono::TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%m-%d-%Y_%I-%M%p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_context_trims_identity_fields() {
        let ctx = SubmissionContext::new("  Jane ", " Doe", " jane@example.com ").unwrap();
        assert_eq!(ctx.first_name, "Jane");
        assert_eq!(ctx.last_name, "Doe");
        assert_eq!(ctx.email, "jane@example.com");
        assert_eq!(ctx.full_name(), "Jane Doe");
    }

    #[test]
    fn test_context_rejects_blank_fields() {
        assert!(SubmissionContext::new("", "Doe", "jane@example.com").is_none());
        assert!(SubmissionContext::new("Jane", "   ", "jane@example.com").is_none());
        assert!(SubmissionContext::new("Jane", "Doe", "").is_none());
    }

    #[test]
    fn test_timestamp_token_format() {
        let afternoon = chrono::Utc.with_ymd_and_hms(2026, 8, 6, 15, 7, 0).unwrap();
        assert_eq!(timestamp_token(afternoon), "08-06-2026_03-07PM");

        let midnight = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 0, 5, 0).unwrap();
        assert_eq!(timestamp_token(midnight), "01-02-2026_12-05AM");
    }

    #[test]
    fn test_artifact_names_share_the_token() {
        let ctx = SubmissionContext::new("Jane", "Doe", "jane@example.com").unwrap();
        let token = ctx.timestamp_token.clone();
        assert_eq!(
            ctx.original_doc_name(),
            format!("Original_Form_Jane_Doe_{token}.pdf")
        );
        assert_eq!(
            ctx.diagram_doc_name(),
            format!("Pain_Diagram_Jane_Doe_{token}.pdf")
        );
        assert_eq!(
            ctx.merged_doc_name(),
            format!("Merged_Patient_Form_Jane_Doe_{token}.pdf")
        );
    }
}
