//! Notification delivery service
//!
//! Sends the run's result payload to a configured endpoint: one POST, JSON
//! body, 2xx is success. No retry or backoff; the orchestrator treats a
//! failure here as log-and-continue.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use formrelay_core::models::{DeliveryResult, UploadedArtifact};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One uploaded document in the notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFile {
    pub file_name: String,
    pub file_id: String,
    pub file_url: String,
}

impl From<&UploadedArtifact> for NotificationFile {
    fn from(artifact: &UploadedArtifact) -> Self {
        Self {
            file_name: artifact.display_name.clone(),
            file_id: artifact.remote_id.clone(),
            file_url: artifact.public_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFiles {
    pub original_pdf: NotificationFile,
    pub pain_diagram_pdf: NotificationFile,
    pub merged_pdf: NotificationFile,
    /// Field name to a single comma-joined string of URLs, never an array.
    /// The downstream consumer only accepts scalar values per field.
    pub images: BTreeMap<String, String>,
}

/// The full payload delivered to the notification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionNotification {
    /// Submitted form fields, passed through verbatim.
    pub form_data: BTreeMap<String, String>,
    pub files: NotificationFiles,
    pub timestamp: String,
    pub platform: String,
    pub compression_used: bool,
}

impl SubmissionNotification {
    pub fn new(form_data: BTreeMap<String, String>, delivery: &DeliveryResult) -> Self {
        Self {
            form_data,
            files: NotificationFiles {
                original_pdf: NotificationFile::from(&delivery.original_doc),
                pain_diagram_pdf: NotificationFile::from(&delivery.diagram_doc),
                merged_pdf: NotificationFile::from(&delivery.merged_doc),
                images: delivery.comma_joined_images(),
            },
            timestamp: Utc::now().to_rfc3339(),
            platform: std::env::consts::OS.to_string(),
            compression_used: true,
        }
    }
}

/// Notification sink client.
pub struct Notifier {
    client: Client,
    url: Option<String>,
}

impl Notifier {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for notifications")?;
        Ok(Self { client, url })
    }

    /// Whether a delivery target is configured for this process.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Deliver the payload. A no-op returning Ok when no target is
    /// configured.
    pub async fn notify(&self, payload: &SubmissionNotification) -> Result<(), NotifyError> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(status = status.as_u16(), "Notification delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
