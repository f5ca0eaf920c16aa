//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the read and search endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorResponse};
use crate::web::state::AppState;
use crate::web::upload::{self, UploadResponse, UploadResult};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use doc_parser_core::domain::{DocumentRecord, DocumentSearchHit, DocumentSummary};
use doc_parser_core::ports::PortError;
use doc_parser_core::search::{finalize_suggestions, SearchFilters, SUGGESTION_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload::upload_handler,
        search_handler,
        list_documents_handler,
        get_document_handler,
        suggest_handler,
    ),
    components(
        schemas(
            UploadResponse,
            UploadResult,
            SearchResponse,
            DocumentSearchResult,
            DocumentListResponse,
            DocumentSummaryResponse,
            DocumentDetailResponse,
            SuggestResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Document Parser API", description = "Upload resumes, extract their fields and search the results.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One row of the document listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentSummaryResponse {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DocumentSummary> for DocumentSummaryResponse {
    fn from(doc: DocumentSummary) -> Self {
        Self {
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
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub results: Vec<DocumentSummaryResponse>,
}

/// One search match, with its JSON collections already decoded.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentSearchResult {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub experience: Value,
    #[schema(value_type = Vec<Object>)]
    pub education: Value,
    #[schema(value_type = Vec<Object>)]
    pub projects: Value,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DocumentSearchHit> for DocumentSearchResult {
    fn from(doc: DocumentSearchHit) -> Self {
        Self {
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
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub results: Vec<DocumentSearchResult>,
}

/// A full stored document, including the raw extraction output.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentDetailResponse {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub experience: Value,
    #[schema(value_type = Vec<Object>)]
    pub education: Value,
    #[schema(value_type = Vec<Object>)]
    pub projects: Value,
    pub summary: Option<String>,
    #[schema(value_type = Object)]
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentDetailResponse {
    fn from(doc: DocumentRecord) -> Self {
        Self {
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
            raw_data: doc.raw_data,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Search documents.
///
/// Every supplied term must match; blank terms are ignored. Results are the newest
/// 50 matches.
#[utoipa::path(
    get,
    path = "/api/search",
    params(
        ("q" = Option<String>, Query, description = "Free text matched against name, email and summary"),
        ("skills" = Option<String>, Query, description = "Matched against each skill"),
        ("experience" = Option<String>, Query, description = "Matched against experience entries"),
        ("education" = Option<String>, Query, description = "Matched against education entries"),
        ("projects" = Option<String>, Query, description = "Matched against project entries"),
    ),
    responses(
        (status = 200, description = "Matching documents, newest first", body = SearchResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    Query(filters): Query<SearchFilters>,
) -> Result<Json<SearchResponse>, ApiError> {
    let hits = app_state.db.search_documents(&filters).await?;
    debug!(matches = hits.len(), "Search completed");
    Ok(Json(SearchResponse {
        results: hits.into_iter().map(DocumentSearchResult::from).collect(),
    }))
}

/// List every document, newest first.
#[utoipa::path(
    get,
    path = "/api/documents",
    responses(
        (status = 200, description = "All documents", body = DocumentListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_documents_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = app_state.db.list_documents().await?;
    Ok(Json(DocumentListResponse {
        results: documents.into_iter().map(DocumentSummaryResponse::from).collect(),
    }))
}

/// Fetch one document by its identifier.
#[utoipa::path(
    get,
    path = "/api/document/{id}",
    params(
        ("id" = String, Path, description = "The document identifier")
    ),
    responses(
        (status = 200, description = "The stored document", body = DocumentDetailResponse),
        (status = 404, description = "No document with that identifier", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetailResponse>, ApiError> {
    // A malformed identifier cannot name a stored document.
    let document_id =
        Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("Document not found".to_string()))?;

    match app_state.db.get_document(document_id).await {
        Ok(document) => Ok(Json(DocumentDetailResponse::from(document))),
        Err(PortError::NotFound(_)) => Err(ApiError::NotFound("Document not found".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Autocomplete suggestions for a search term.
///
/// Draws on name and email prefixes, skills, and string values inside the
/// experience, education and project entries. At most 10, sorted, no duplicates.
#[utoipa::path(
    get,
    path = "/api/suggest",
    params(
        ("q" = Option<String>, Query, description = "The partial search term")
    ),
    responses(
        (status = 200, description = "Suggestions", body = SuggestResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn suggest_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Ok(Json(SuggestResponse { suggestions: Vec::new() }));
    }

    let candidates = app_state
        .db
        .suggestion_candidates(query)
        .await
        .map_err(|e| {
            error!("Failed to fetch suggestions: {:?}", e);
            ApiError::from(e)
        })?;

    Ok(Json(SuggestResponse {
        suggestions: finalize_suggestions(candidates, SUGGESTION_LIMIT),
    }))
}
