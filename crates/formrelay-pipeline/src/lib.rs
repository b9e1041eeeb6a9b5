//! Formrelay Pipeline Library
//!
//! The upload orchestrator: one end-to-end run per submitted form.
//! Validate the submission, merge the two required documents, run the
//! compression cascade over all three artifacts, resolve the remote
//! namespace, fan out every upload, notify the configured sink, and always
//! clean up local staging files.

pub mod error;
pub mod orchestrator;
pub mod response;
pub mod stage;
pub mod temp;
mod validate;

pub use error::{PipelineError, ReceivedDiagnostics};
pub use orchestrator::{Submission, UploadOrchestrator};
pub use response::{ResponseFiles, SubmissionResponse};
pub use stage::Stage;
