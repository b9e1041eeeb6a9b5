//! Configuration module
//!
//! Environment-driven configuration for the ingestion pipeline: local
//! staging, the remote document store root, compression preferences, and the
//! optional notification endpoint.

use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_STAGING_DIR;

const REMOTE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IMAGE_QUALITY: f32 = 0.3;

/// Application configuration for one pipeline process.
#[derive(Clone, Debug)]
pub struct Config {
    /// Local staging directory for all transient artifacts. Shared across
    /// concurrent runs; never assumed empty at start.
    pub staging_dir: PathBuf,
    /// Remote folder id under which per-submitter folders are created.
    pub drive_root_folder_id: String,
    /// Base directory for the local document store backend.
    pub store_base_dir: PathBuf,
    /// Base URL used to mint public links for the local store backend.
    pub store_base_url: String,
    /// Notification endpoint. Absent means the Notifying stage is skipped.
    pub webhook_url: Option<String>,
    /// Timeout applied to each remote call (upload, notify).
    pub remote_timeout_seconds: u64,
    /// Whether the external compression binary is preferred over the
    /// raster strategy when both are viable.
    pub prefer_ghostscript: bool,
    /// JPEG quality factor (0.0..=1.0) for the raster compression strategy.
    pub image_quality: f32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let staging_dir = env::var("STAGING_DIR")
            .unwrap_or_else(|_| DEFAULT_STAGING_DIR.to_string())
            .into();

        let drive_root_folder_id =
            env::var("DRIVE_ROOT_FOLDER_ID").unwrap_or_else(|_| "root".to_string());

        let store_base_dir = env::var("STORE_BASE_DIR")
            .unwrap_or_else(|_| "drive".to_string())
            .into();

        let store_base_url = env::var("STORE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:4000/drive".to_string());

        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|u| !u.is_empty());

        let remote_timeout_seconds = env::var("REMOTE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| REMOTE_TIMEOUT_SECS.to_string())
            .parse()
            .unwrap_or(REMOTE_TIMEOUT_SECS);

        let prefer_ghostscript = env::var("PREFER_GHOSTSCRIPT")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let image_quality = env::var("IMAGE_QUALITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|q| (0.0..=1.0).contains(q))
            .unwrap_or(DEFAULT_IMAGE_QUALITY);

        Ok(Config {
            staging_dir,
            drive_root_folder_id,
            store_base_dir,
            store_base_url,
            webhook_url,
            remote_timeout_seconds,
            prefer_ghostscript,
            image_quality,
        })
    }
}
