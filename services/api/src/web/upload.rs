//! services/api/src/web/upload.rs
//!
//! The batch upload endpoint: each accepted file is stored transiently, sent to the
//! extraction service, mapped into a document record and inserted. One file failing
//! never aborts its siblings.

use crate::error::{ApiError, ErrorResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    response::Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use doc_parser_core::domain::NewDocument;
use doc_parser_core::ports::{PortError, PortResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// The multipart field carrying the files.
pub const FILES_FIELD: &str = "files";

/// Accepted file extensions, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

//=========================================================================================
// Response Structs
//=========================================================================================

/// The outcome for one submitted file.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResult {
    Success {
        id: Uuid,
        filename: String,
        #[schema(value_type = Object)]
        data: Map<String, Value>,
    },
    Error {
        filename: String,
        error: String,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub results: Vec<UploadResult>,
}

//=========================================================================================
// Filename Handling
//=========================================================================================

/// The lowercase extension of `filename` when it is one we accept.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduces a client-supplied filename to a safe base name.
///
/// Directory components are dropped, whitespace becomes `_`, and anything outside
/// `[A-Za-z0-9._-]` is removed.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// The name a file is stored under: a timestamp prefix keeps concurrent uploads of the
/// same name apart.
pub fn stored_filename(original: &str, extension: &str, now: DateTime<Utc>) -> String {
    let raw_stem = original.rsplit_once('.').map_or(original, |(stem, _)| stem);
    let stem = sanitize_filename(raw_stem);
    let stem = if stem.is_empty() { "upload".to_string() } else { stem };
    format!("{}{}.{}", now.format("%Y%m%d_%H%M%S_%6f_"), stem, extension)
}

//=========================================================================================
// Transient Storage
//=========================================================================================

/// An uploaded file on disk for the duration of one extraction.
/// The file is removed when this guard is dropped, on every exit path.
struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    async fn create(path: PathBuf, contents: &[u8]) -> std::io::Result<Self> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        // The guard exists before the write so a partial file is cleaned up too.
        let file = Self { path };
        tokio::fs::write(&file.path, contents).await?;
        Ok(file)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove transient file {}: {}", self.path.display(), e),
        }
    }
}

//=========================================================================================
// Handler
//=========================================================================================

/// Upload a batch of resumes.
///
/// Accepts a multipart/form-data request with one or more `files` parts. Files whose
/// extension is not pdf, doc or docx are skipped without an entry in the response.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "One or more `files` parts."),
    responses(
        (status = 200, description = "One result per processed file", body = UploadResponse),
        (status = 400, description = "No files provided", body = ErrorResponse),
        (status = 413, description = "Request body over the size limit", body = ErrorResponse)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let max_bytes = app_state.config.max_upload_bytes;
    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > max_bytes) {
        return Err(ApiError::PayloadTooLarge(format!(
            "Request body exceeds the {} byte limit",
            max_bytes
        )));
    }

    // All parts are read before the first is processed: a request rejected by the
    // size limit stores nothing.
    let mut saw_file_part = false;
    let mut accepted: Vec<(String, String, Bytes)> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };
        saw_file_part = true;

        if original.trim().is_empty() {
            continue;
        }
        let Some(extension) = allowed_extension(&original) else {
            debug!(filename = %original, "Skipping file with disallowed extension");
            continue;
        };

        let data = field.bytes().await?;
        accepted.push((original, extension, data));
    }

    if !saw_file_part {
        return Err(ApiError::Validation("No files provided".to_string()));
    }

    let mut results = Vec::with_capacity(accepted.len());
    for (original, extension, data) in accepted {
        results.push(ingest_file(&app_state, &original, &extension, data).await);
    }

    let succeeded = results
        .iter()
        .filter(|r| matches!(r, UploadResult::Success { .. }))
        .count();
    info!(
        files = results.len(),
        succeeded,
        failed = results.len() - succeeded,
        "Upload batch processed"
    );

    Ok(Json(UploadResponse { results }))
}

async fn ingest_file(state: &AppState, original: &str, extension: &str, data: Bytes) -> UploadResult {
    let filename = stored_filename(original, extension, Utc::now());
    let path = state.config.upload_dir.join(&filename);

    match extract_and_store(state, &filename, path, &data).await {
        Ok((id, fields)) => {
            info!(document_id = %id, filename = %filename, "Document stored");
            UploadResult::Success {
                id,
                filename,
                data: fields,
            }
        }
        Err(e) => {
            warn!(filename = %filename, "Failed to process upload: {}", e);
            UploadResult::Error {
                filename,
                error: e.to_string(),
            }
        }
    }
}

async fn extract_and_store(
    state: &AppState,
    filename: &str,
    path: PathBuf,
    data: &[u8],
) -> PortResult<(Uuid, Map<String, Value>)> {
    let transient = TransientFile::create(path, data)
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to save upload: {}", e)))?;

    let timeout = state.config.extraction_timeout;
    let fields = tokio::time::timeout(timeout, state.extractor.extract(transient.path()))
        .await
        .map_err(|_| {
            PortError::Timeout(format!("extraction did not finish within {}s", timeout.as_secs()))
        })??;

    let document = NewDocument::from_extraction(filename, fields.clone());
    let id = state.db.insert_document(document).await?;
    Ok((id, fields))
}
