use serde::{Deserialize, Serialize};

use crate::store::FileRecord;

/// Body of `/delete_file` and `/convert_file`.
#[derive(Debug, Deserialize)]
pub struct FileNameRequest {
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileRecord,
}

/// Confirmation for best-effort operations; `cleanup_failures` counts artifacts
/// that could not be removed from disk.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    pub cleanup_failures: usize,
}
