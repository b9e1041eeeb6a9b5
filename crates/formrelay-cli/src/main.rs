//! Command-line driver for the ingestion pipeline.
//!
//! Stages local files as one submission and runs it against the configured
//! local document store, printing the response JSON. The HTTP ingestion
//! layer is an external collaborator; this binary is the development and
//! operations surface for one-off runs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use formrelay_core::config::Config;
use formrelay_core::constants::{DIAGRAM_DOC_FIELD, PRIMARY_DOC_FIELD};
use formrelay_core::ErrorMetadata;
use formrelay_pipeline::orchestrator::stage_input;
use formrelay_pipeline::{Submission, UploadOrchestrator};
use formrelay_storage::LocalDriveStore;

#[derive(Parser)]
#[command(name = "formrelay", version, about = "Forms intake document pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one submission through the pipeline
    Submit(SubmitArgs),
}

#[derive(clap::Args)]
struct SubmitArgs {
    /// Primary form document (PDF)
    #[arg(long)]
    pdf: PathBuf,

    /// Pain diagram document (PDF)
    #[arg(long)]
    diagram: PathBuf,

    /// Auxiliary image as FIELD=PATH; repeatable
    #[arg(long = "image", value_name = "FIELD=PATH")]
    images: Vec<String>,

    /// Extra form field as KEY=VALUE; repeatable
    #[arg(long = "field", value_name = "KEY=VALUE")]
    fields: Vec<String>,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    email: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Submit(args) => submit(args).await,
    }
}

async fn submit(args: SubmitArgs) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let store = Arc::new(
        LocalDriveStore::new(config.store_base_dir.clone(), config.store_base_url.clone())
            .await
            .context("Failed to open document store")?,
    );

    let mut files = Vec::new();
    files.push(stage_input(&config.staging_dir, PRIMARY_DOC_FIELD, &args.pdf).await?);
    files.push(stage_input(&config.staging_dir, DIAGRAM_DOC_FIELD, &args.diagram).await?);
    for spec in &args.images {
        let (field, path) = split_pair(spec)?;
        files.push(stage_input(&config.staging_dir, field, &PathBuf::from(path)).await?);
    }

    let mut fields = vec![
        ("firstname".to_string(), args.first_name.clone()),
        ("lastname".to_string(), args.last_name.clone()),
        ("email".to_string(), args.email.clone()),
    ];
    for spec in &args.fields {
        let (key, value) = split_pair(spec)?;
        fields.push((key.to_string(), value.to_string()));
    }

    let orchestrator = UploadOrchestrator::new(config, store)?;
    match orchestrator.run(Submission { files, fields }).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.response_body())?);
            Err(anyhow!("Run failed with status {}", e.http_status_code()))
        }
    }
}

fn split_pair(spec: &str) -> Result<(&str, &str)> {
    spec.split_once('=')
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{spec}'"))
}
