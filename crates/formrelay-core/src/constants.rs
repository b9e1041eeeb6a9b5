//! Application-wide constants.

/// Field name that tags the primary submitted document.
pub const PRIMARY_DOC_FIELD: &str = "pdf";

/// Field name that tags the pain diagram document.
pub const DIAGRAM_DOC_FIELD: &str = "painDiagramPdf";

/// Name of the images folder created under every submitter folder.
pub const IMAGES_FOLDER_NAME: &str = "Images";

/// Default local staging directory for transient artifacts.
pub const DEFAULT_STAGING_DIR: &str = "uploads";
