//! File uploads
//!
//! Multipart uploads to the media pipeline, with filename and MIME
//! inference from the path extension.

use api_client::http::{ApiClient, ApiError, ApiRequest, ApiResponse, MultipartFile};
use api_client::types::DataEnvelope;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Result of a single file upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// Public URL of the stored file
    pub url: String,
    /// Storage public id
    pub public_id: String,
    /// Detected format
    #[serde(default)]
    pub format: String,
    /// Image width, when applicable
    #[serde(default)]
    pub width: u32,
    /// Image height, when applicable
    #[serde(default)]
    pub height: u32,
    /// Stored size in bytes
    #[serde(default)]
    pub size: u64,
}

/// One stored file from a multi-file upload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Name the file was uploaded with
    pub original_name: String,
    /// Public URL of the stored file
    pub url: String,
    /// Storage public id
    #[serde(alias = "public_id")]
    pub public_id: String,
}

/// Result of a multi-file upload
#[derive(Debug, Clone, Deserialize)]
pub struct MultipleUploadResponse {
    /// Server message
    #[serde(default)]
    pub message: String,
    /// Stored files
    pub files: Vec<UploadedFile>,
}

/// File name component of a path, or the whole path when there is none
pub fn file_name_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// MIME type inferred from a file extension
pub fn mime_type_for(path: &str) -> &'static str {
    let extension = Path::new(file_name_from_path(path))
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" | "docx" => "application/msword",
        "xls" | "xlsx" => "application/vnd.ms-excel",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Typed client for the upload endpoints
#[derive(Clone)]
pub struct UploadService {
    client: Arc<ApiClient>,
}

impl UploadService {
    /// Create a new upload service over a shared client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `POST /file/upload-cloudinary` with one file
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ApiError> {
        let request = ApiRequest::post("/file/upload-cloudinary").multipart(vec![MultipartFile {
            field: "file".to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type_for(file_name).to_string(),
            bytes,
        }]);

        tracing::debug!(file_name, "uploading file");

        let response: ApiResponse<DataEnvelope<UploadResponse>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }

    /// `POST /file/upload-cloudinary` reading the file from disk
    pub async fn upload_path(&self, path: &str) -> Result<UploadResponse, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::new(0, "FileReadError", e.to_string()))?;
        self.upload(file_name_from_path(path), bytes).await
    }

    /// `POST /file/upload-cloudinary-multiple` with several files
    pub async fn upload_many(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<MultipleUploadResponse, ApiError> {
        let parts = files
            .into_iter()
            .map(|(file_name, bytes)| MultipartFile {
                field: "files".to_string(),
                mime_type: mime_type_for(&file_name).to_string(),
                file_name,
                bytes,
            })
            .collect();

        let request = ApiRequest::post("/file/upload-cloudinary-multiple").multipart(parts);

        let response: ApiResponse<DataEnvelope<MultipleUploadResponse>> =
            self.client.send(request).await?;
        Ok(response.data.data)
    }
}
