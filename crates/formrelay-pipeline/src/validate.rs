//! Submission preconditions.
//!
//! Structural checks run before any I/O beyond the already-staged uploads:
//! exactly one primary document, exactly one diagram document, and a
//! non-empty submitter identity. Violations fail fast with the `received`
//! diagnostic map.

use formrelay_core::constants::{DIAGRAM_DOC_FIELD, PRIMARY_DOC_FIELD};
use formrelay_core::models::{InputFile, SubmissionContext};

use crate::error::{PipelineError, ReceivedDiagnostics};
use crate::orchestrator::Submission;

/// A submission that passed validation, with the two required documents
/// singled out and auxiliary files in arrival order.
#[derive(Debug)]
pub(crate) struct ValidatedSubmission<'a> {
    pub primary: &'a InputFile,
    pub diagram: &'a InputFile,
    pub aux: Vec<&'a InputFile>,
    pub ctx: SubmissionContext,
}

pub(crate) fn validate(submission: &Submission) -> Result<ValidatedSubmission<'_>, PipelineError> {
    let primaries: Vec<_> = submission
        .files
        .iter()
        .filter(|f| f.field_name == PRIMARY_DOC_FIELD)
        .collect();
    let diagrams: Vec<_> = submission
        .files
        .iter()
        .filter(|f| f.field_name == DIAGRAM_DOC_FIELD)
        .collect();

    if primaries.len() != 1 || diagrams.len() != 1 {
        return Err(PipelineError::Validation {
            message: "Both PDF and pain diagram are required.".to_string(),
            received: ReceivedDiagnostics::Files {
                pdf: primaries.len() == 1,
                pain_diagram: diagrams.len() == 1,
            },
        });
    }

    let first_name = submission.field("firstname").unwrap_or_default();
    let last_name = submission.field("lastname").unwrap_or_default();
    let email = submission.field("email").unwrap_or_default();

    let ctx = SubmissionContext::new(first_name, last_name, email).ok_or_else(|| {
        PipelineError::Validation {
            message: "First name, last name, and email are required.".to_string(),
            received: ReceivedDiagnostics::Identity {
                first_name: !first_name.trim().is_empty(),
                last_name: !last_name.trim().is_empty(),
                email: !email.trim().is_empty(),
            },
        }
    })?;

    let aux = submission
        .files
        .iter()
        .filter(|f| f.field_name != PRIMARY_DOC_FIELD && f.field_name != DIAGRAM_DOC_FIELD)
        .collect();

    Ok(ValidatedSubmission {
        primary: primaries[0],
        diagram: diagrams[0],
        aux,
        ctx,
    })
}
