//! Document library: listing, uploading and deleting the account's documents.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::api::{DocChatApi, DocumentInfo, DocumentUpload};
use crate::error::ClientError;
use crate::views::ListView;

/// Largest file the service accepts
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const DOCUMENTS_FAILED_NOTICE: &str = "Failed to load documents";
pub const UPLOAD_FAILED_NOTICE: &str = "Failed to upload document";
pub const DELETE_FAILED_NOTICE: &str = "Failed to delete document";

pub struct DocumentLibrary<A: DocChatApi> {
    api: Arc<A>,
}

impl<A: DocChatApi> DocumentLibrary<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> ListView<DocumentInfo> {
        ListView::from_result(self.api.list_documents().await, DOCUMENTS_FAILED_NOTICE)
    }

    /// Validate the file locally, then upload it.
    pub async fn upload(&self, path: &Path) -> Result<DocumentInfo, ClientError> {
        let upload = prepare_upload(path)?;
        let document = self.api.upload_document(upload).await?;
        info!(document = %document.id, chunks = document.chunk_count, "document uploaded");
        Ok(document)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.api.delete_document(id).await?;
        info!(document = %id, "document deleted");
        Ok(())
    }
}

/// MIME type for a supported file, chosen by extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

/// Read a file into an upload, rejecting oversized or unsupported files before
/// anything is sent.
pub fn prepare_upload(path: &Path) -> Result<DocumentUpload, ClientError> {
    let metadata = fs::metadata(path)
        .map_err(|e| ClientError::storage(format!("{}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(ClientError::validation(format!("{} is not a file", path.display())));
    }
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err(ClientError::validation("File size must be less than 10MB"));
    }

    let mime_type = mime_type_for(path)
        .ok_or_else(|| ClientError::validation("Only PDF and TXT files are supported"))?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::validation("File name is not valid UTF-8"))?;

    let bytes = fs::read(path)
        .map_err(|e| ClientError::storage(format!("{}: {}", path.display(), e)))?;

    Ok(DocumentUpload {
        filename,
        mime_type,
        bytes,
    })
}

/// Human-readable file size, e.g. `1.5 MB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
