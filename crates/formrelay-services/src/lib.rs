//! Formrelay Services Library
//!
//! External-collaborator services for the pipeline. Currently the
//! notification sink: one POST of the run's result payload to a configured
//! endpoint.

pub mod notify;

pub use notify::{Notifier, NotifyError, SubmissionNotification};
