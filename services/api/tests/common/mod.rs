// Common test utilities: in-memory port implementations, request helpers and the
// Postgres harness.

#![allow(dead_code)]

pub mod harness;

use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use doc_parser_core::domain::{DocumentRecord, DocumentSearchHit, DocumentSummary, NewDocument};
use doc_parser_core::ports::{DatabaseService, ExtractionService, PortError, PortResult};
use doc_parser_core::search::{SearchFilters, SEARCH_LIMIT};
use futures::StreamExt;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "X-DOC-PARSER-TEST-BOUNDARY";

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

#[derive(Default)]
pub struct InMemoryDb {
    documents: Mutex<Vec<DocumentRecord>>,
    pub fail_suggestions: bool,
}

impl InMemoryDb {
    pub fn failing_suggestions() -> Self {
        Self {
            fail_suggestions: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn newest_first(&self) -> Vec<DocumentRecord> {
        let mut documents = self.documents.lock().unwrap().clone();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        documents
    }
}

fn summary_of(doc: DocumentRecord) -> DocumentSummary {
    DocumentSummary {
        id: doc.id,
        filename: doc.filename,
        name: doc.name,
        email: doc.email,
        phone: doc.phone,
        location: doc.location,
        skills: doc.skills,
        created_at: doc.created_at,
    }
}

fn search_hit_of(doc: DocumentRecord) -> DocumentSearchHit {
    DocumentSearchHit {
        id: doc.id,
        filename: doc.filename,
        name: doc.name,
        email: doc.email,
        phone: doc.phone,
        location: doc.location,
        skills: doc.skills,
        experience: doc.experience,
        education: doc.education,
        projects: doc.projects,
        summary: doc.summary,
        created_at: doc.created_at,
    }
}

/// String leaves of `value` containing `query`, case-insensitively.
fn matching_leaf_strings(value: &Value, query: &str, out: &mut Vec<String>) {
    match value {
        Value::String(s) if contains_ci(s, query) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| matching_leaf_strings(v, query, out)),
        Value::Object(map) => map.values().for_each(|v| matching_leaf_strings(v, query, out)),
        _ => {}
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(doc: &DocumentRecord, filters: &SearchFilters) -> bool {
    let optional_ci = |field: &Option<String>, t: &str| field.as_deref().is_some_and(|f| contains_ci(f, t));
    let text_ok = filters.text().map_or(true, |t| {
        optional_ci(&doc.name, t) || optional_ci(&doc.email, t) || optional_ci(&doc.summary, t)
    });
    let skills_ok = filters
        .skills()
        .map_or(true, |s| doc.skills.iter().any(|skill| contains_ci(skill, s)));
    let json_ok =
        |value: &Value, term: Option<&str>| term.map_or(true, |t| contains_ci(&value.to_string(), t));

    text_ok
        && skills_ok
        && json_ok(&doc.experience, filters.experience())
        && json_ok(&doc.education, filters.education())
        && json_ok(&doc.projects, filters.projects())
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn insert_document(&self, document: NewDocument) -> PortResult<Uuid> {
        let mut documents = self.documents.lock().unwrap();
        let id = Uuid::new_v4();
        // Strictly increasing timestamps keep ordering deterministic.
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap()
            + Duration::seconds(documents.len() as i64);
        documents.push(DocumentRecord {
            id,
            filename: document.filename,
            name: document.name,
            email: document.email,
            phone: document.phone,
            location: document.location,
            skills: document.skills,
            experience: document.experience,
            education: document.education,
            projects: document.projects,
            summary: document.summary,
            raw_data: document.raw_data,
            created_at,
            updated_at: created_at,
        });
        Ok(id)
    }

    async fn list_documents(&self) -> PortResult<Vec<DocumentSummary>> {
        Ok(self.newest_first().into_iter().map(summary_of).collect())
    }

    async fn search_documents(&self, filters: &SearchFilters) -> PortResult<Vec<DocumentSearchHit>> {
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|doc| matches(doc, filters))
            .take(SEARCH_LIMIT as usize)
            .map(search_hit_of)
            .collect())
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<DocumentRecord> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|doc| doc.id == document_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn suggestion_candidates(&self, query: &str) -> PortResult<Vec<String>> {
        if self.fail_suggestions {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        let q = query.to_lowercase();
        let mut candidates = Vec::new();
        for doc in self.newest_first() {
            for value in [&doc.name, &doc.email].into_iter().flatten() {
                if value.to_lowercase().starts_with(&q) {
                    candidates.push(value.clone());
                }
            }
            candidates.extend(doc.skills.iter().filter(|s| s.to_lowercase().contains(&q)).cloned());
            for value in [&doc.experience, &doc.education, &doc.projects] {
                matching_leaf_strings(value, query, &mut candidates);
            }
        }
        Ok(candidates)
    }
}

//=========================================================================================
// Scripted ExtractionService
//=========================================================================================

/// Returns a canned field set per file stem. Files whose name contains `broken` fail,
/// and files whose name contains `slow` never finish.
#[derive(Default)]
pub struct ScriptedExtractor {
    responses: HashMap<String, Value>,
    /// Every path seen, with whether the file existed during the call.
    pub calls: Mutex<Vec<(PathBuf, bool)>>,
}

impl ScriptedExtractor {
    pub fn with_response(mut self, original_stem: &str, fields: Value) -> Self {
        self.responses.insert(original_stem.to_string(), fields);
        self
    }
}

#[async_trait]
impl ExtractionService for ScriptedExtractor {
    async fn extract(&self, path: &Path) -> PortResult<Map<String, Value>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push((path.to_path_buf(), path.exists()));

        if name.contains("broken") {
            return Err(PortError::Unexpected("extraction service rejected the file".to_string()));
        }
        if name.contains("slow") {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        }

        let fields = self
            .responses
            .iter()
            .find(|(stem, _)| name.contains(stem.as_str()))
            .map(|(_, fields)| fields.clone())
            .unwrap_or_else(|| json!({ "name": name, "skills": [] }));

        match fields {
            Value::Object(map) => Ok(map),
            _ => Err(PortError::Unexpected("scripted response must be an object".to_string())),
        }
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub extractor: Arc<ScriptedExtractor>,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new(db: InMemoryDb, extractor: ScriptedExtractor) -> Self {
        Self::with_vars(db, extractor, &[])
    }

    pub fn with_vars(db: InMemoryDb, extractor: ScriptedExtractor, vars: &[(&str, &str)]) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");
        let mut env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.insert(
            "UPLOAD_DIR".to_string(),
            upload_dir.path().to_string_lossy().into_owned(),
        );
        let config = Config::from_lookup(|key| env.get(key).cloned()).expect("test config");

        let db = Arc::new(db);
        let extractor = Arc::new(extractor);
        let state = Arc::new(AppState {
            db: db.clone(),
            extractor: extractor.clone(),
            config: Arc::new(config),
        });
        let router = web::router(state).expect("router");

        Self {
            router,
            db,
            extractor,
            upload_dir,
        }
    }

    /// Sends a request and returns the status with the decoded JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.send(request).await
    }

    pub async fn upload(&self, parts: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
        self.send(upload_request(parts)).await
    }

    /// Files currently left in the upload directory.
    pub fn transient_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .expect("read upload dir")
            .map(|entry| entry.expect("dir entry").path())
            .collect()
    }
}

/// Encodes `(field name, filename, contents)` parts as a multipart body.
pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, contents) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Encodes a single non-file text part.
pub fn text_part_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{b}--\r\n",
        b = BOUNDARY,
    )
    .into_bytes()
}

fn upload_builder() -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
}

/// An upload with a fully buffered body and a Content-Length header.
pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    upload_builder()
        .header("content-length", body.len())
        .body(Body::from(body))
        .expect("build upload request")
}

pub fn upload_request(parts: &[(&str, &str, &[u8])]) -> Request<Body> {
    multipart_request(multipart_body(parts))
}

/// An upload whose body arrives in `chunk_size` pieces over time, with no
/// Content-Length header.
pub fn streaming_upload_request(parts: &[(&str, &str, &[u8])], chunk_size: usize) -> Request<Body> {
    let chunks: Vec<Bytes> = multipart_body(parts)
        .chunks(chunk_size)
        .map(Bytes::copy_from_slice)
        .collect();
    let stream = futures::stream::iter(chunks).then(|chunk| async move {
        tokio::task::yield_now().await;
        Ok::<_, std::io::Error>(chunk)
    });
    upload_builder()
        .body(Body::from_stream(stream))
        .expect("build streaming upload request")
}
