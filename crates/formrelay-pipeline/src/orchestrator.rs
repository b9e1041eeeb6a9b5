//! End-to-end upload orchestration.
//!
//! Drives one submission through the stage machine. Fatal failures abort the
//! remaining stages; cleanup of local staging files runs on every exit path.
//! Already-uploaded remote files are deliberately not rolled back when a
//! later upload fails; the notification is skipped on that path so the
//! downstream consumer never sees a partial file set.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::try_join_all;

use formrelay_core::config::Config;
use formrelay_core::constants::IMAGES_FOLDER_NAME;
use formrelay_core::models::{DeliveryResult, InputFile, UploadedArtifact};
use formrelay_processing::{merge, CompressionCascade, CompressionOptions, QualityPreset};
use formrelay_services::{Notifier, SubmissionNotification};
use formrelay_storage::{DocumentStore, NamespaceResolver};

use crate::error::PipelineError;
use crate::response::{ResponseFiles, SubmissionResponse};
use crate::stage::Stage;
use crate::temp::TempSet;
use crate::validate::{validate, ValidatedSubmission};

/// One submitted form: staged files tagged by field name plus the flat set
/// of submitted form values.
#[derive(Debug, Clone)]
pub struct Submission {
    pub files: Vec<InputFile>,
    pub fields: Vec<(String, String)>,
}

impl Submission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub struct UploadOrchestrator {
    config: Config,
    store: Arc<dyn DocumentStore>,
    cascade: CompressionCascade,
    notifier: Notifier,
}

impl UploadOrchestrator {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let notifier = Notifier::new(
            config.webhook_url.clone(),
            Duration::from_secs(config.remote_timeout_seconds),
        )?;
        Ok(Self {
            config,
            store,
            cascade: CompressionCascade::new(),
            notifier,
        })
    }

    /// Run one submission end to end. Local staging files are removed on
    /// both the success and the failure path.
    pub async fn run(&self, submission: Submission) -> Result<SubmissionResponse, PipelineError> {
        let mut temps = TempSet::new();
        for file in &submission.files {
            temps.register(&file.local_path);
        }

        let outcome = self.run_inner(&submission, &mut temps).await;

        tracing::info!(stage = %Stage::CleaningUp, "Removing staging files");
        temps.cleanup().await;

        match &outcome {
            Ok(_) => tracing::info!(stage = %Stage::Done, "Upload run complete"),
            Err(e) => tracing::error!(
                stage = %Stage::Failed,
                failed_at = %e.stage(),
                error = %e,
                "Upload run failed"
            ),
        }
        outcome
    }

    async fn run_inner(
        &self,
        submission: &Submission,
        temps: &mut TempSet,
    ) -> Result<SubmissionResponse, PipelineError> {
        let mut stage = Stage::Validating;
        tracing::info!(stage = %stage, "Upload request received");

        let validated = validate(submission)?;
        let ctx = &validated.ctx;
        tracing::info!(submitter = %ctx.full_name(), "Processing form");

        stage = stage.next();
        tracing::info!(stage = %stage, "Merging documents");
        tokio::fs::create_dir_all(&self.config.staging_dir).await?;

        let primary_bytes = tokio::fs::read(&validated.primary.local_path).await?;
        let diagram_bytes = tokio::fs::read(&validated.diagram.local_path).await?;
        let merged_bytes = merge(&[primary_bytes, diagram_bytes])?;

        let merged_path = self.config.staging_dir.join(ctx.merged_doc_name());
        tokio::fs::write(&merged_path, &merged_bytes).await?;
        temps.register(&merged_path);

        stage = stage.next();
        tracing::info!(stage = %stage, "Compressing documents");
        let compressed_original_name = format!("Compressed_{}", ctx.original_doc_name());
        let compressed_diagram_name = format!("Compressed_{}", ctx.diagram_doc_name());
        let compressed_merged_name = format!("Compressed_{}", ctx.merged_doc_name());

        let compressed_original = self.config.staging_dir.join(&compressed_original_name);
        let compressed_diagram = self.config.staging_dir.join(&compressed_diagram_name);
        let compressed_merged = self.config.staging_dir.join(&compressed_merged_name);

        // Registered before compression so partial outputs are cleaned too.
        temps.register(&compressed_original);
        temps.register(&compressed_diagram);
        temps.register(&compressed_merged);

        let opts = CompressionOptions {
            quality: QualityPreset::Screen,
            image_quality: self.config.image_quality,
            prefer_ghostscript: self.config.prefer_ghostscript,
        };
        tokio::try_join!(
            self.cascade
                .compress(&validated.primary.local_path, &compressed_original, &opts),
            self.cascade
                .compress(&validated.diagram.local_path, &compressed_diagram, &opts),
            self.cascade.compress(&merged_path, &compressed_merged, &opts),
        )
        .map_err(|e| PipelineError::Compression(e.to_string()))?;

        stage = stage.next();
        tracing::info!(stage = %stage, "Resolving remote folders");
        let resolver = NamespaceResolver::new(self.store.clone());
        let user_folder = resolver
            .resolve(&ctx.full_name(), &self.config.drive_root_folder_id)
            .await
            .map_err(|e| PipelineError::FolderResolution(e.to_string()))?;
        // Deterministic layout: the Images folder exists even for runs with
        // no auxiliary files.
        let images_folder = resolver
            .resolve(IMAGES_FOLDER_NAME, &user_folder.id)
            .await
            .map_err(|e| PipelineError::FolderResolution(e.to_string()))?;

        stage = stage.next();
        tracing::info!(stage = %stage, "Uploading artifacts");
        let field_uploads = self
            .prepare_field_uploads(&validated, &resolver, &images_folder.id)
            .await?;

        let (original_doc, diagram_doc, merged_doc, images_by_field) = tokio::try_join!(
            self.upload_artifact(&compressed_original, &compressed_original_name, &user_folder.id),
            self.upload_artifact(&compressed_diagram, &compressed_diagram_name, &user_folder.id),
            self.upload_artifact(&compressed_merged, &compressed_merged_name, &user_folder.id),
            try_join_all(field_uploads),
        )?;

        let delivery = DeliveryResult {
            original_doc,
            diagram_doc,
            merged_doc,
            images_by_field,
        };

        stage = stage.next();
        if self.notifier.is_configured() {
            tracing::info!(stage = %stage, "Delivering notification");
            let form_data: BTreeMap<String, String> =
                submission.fields.iter().cloned().collect();
            let payload = SubmissionNotification::new(form_data, &delivery);
            // Best effort: a failed notification never fails the run.
            if let Err(e) = self.notifier.notify(&payload).await {
                tracing::warn!(error = %e, "Notification delivery failed");
            }
        }

        Ok(SubmissionResponse {
            success: true,
            message: "All files uploaded and processed successfully".to_string(),
            files: ResponseFiles {
                original_pdf_url: delivery.original_doc.public_url.clone(),
                pain_diagram_pdf_url: delivery.diagram_doc.public_url.clone(),
                merged_pdf_url: delivery.merged_doc.public_url.clone(),
                images: delivery.comma_joined_images(),
            },
        })
    }

    /// Resolve each field's subfolder once, then build one future per field
    /// that fans out that field's uploads concurrently. Results keep field
    /// arrival order, and file arrival order within a field.
    async fn prepare_field_uploads<'a>(
        &'a self,
        validated: &ValidatedSubmission<'a>,
        resolver: &NamespaceResolver,
        images_folder_id: &str,
    ) -> Result<
        Vec<impl std::future::Future<Output = Result<(String, Vec<UploadedArtifact>), PipelineError>> + 'a>,
        PipelineError,
    > {
        let mut groups: Vec<(String, Vec<&'a InputFile>)> = Vec::new();
        for &file in &validated.aux {
            match groups.iter_mut().find(|(field, _)| *field == file.field_name) {
                Some((_, files)) => files.push(file),
                None => groups.push((file.field_name.clone(), vec![file])),
            }
        }

        let mut field_uploads = Vec::with_capacity(groups.len());
        for (field, files) in groups {
            let subfolder = resolver
                .resolve(&field.replace('_', " "), images_folder_id)
                .await
                .map_err(|e| PipelineError::FolderResolution(e.to_string()))?;

            let uploads: Vec<_> = files
                .into_iter()
                .map(|file| {
                    let parent = subfolder.id.clone();
                    async move {
                        self.upload_artifact(&file.local_path, &file.original_name, &parent)
                            .await
                    }
                })
                .collect();

            field_uploads.push(async move {
                let artifacts = try_join_all(uploads).await?;
                Ok((field, artifacts))
            });
        }
        Ok(field_uploads)
    }

    async fn upload_artifact(
        &self,
        local_path: &std::path::Path,
        remote_name: &str,
        parent_id: &str,
    ) -> Result<UploadedArtifact, PipelineError> {
        let artifact = self
            .store
            .upload_file(local_path, remote_name, parent_id)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;
        self.store
            .grant_public_read(&artifact.remote_id)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;
        Ok(artifact)
    }
}

/// Stage a source file into the staging directory under a
/// millisecond-namespaced name and describe it as an [`InputFile`]. Used by
/// ingestion layers that receive files outside the staging directory.
pub async fn stage_input(
    staging_dir: &std::path::Path,
    field_name: &str,
    source: &std::path::Path,
) -> std::io::Result<InputFile> {
    tokio::fs::create_dir_all(staging_dir).await?;

    let original_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let staged_path: PathBuf = staging_dir.join(format!("{millis}-{original_name}"));

    tokio::fs::copy(source, &staged_path).await?;
    let size_bytes = tokio::fs::metadata(&staged_path).await?.len();

    Ok(InputFile {
        field_name: field_name.to_string(),
        original_name,
        local_path: staged_path,
        size_bytes,
    })
}
