//! crates/doc_parser_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete record store and extraction service.

use crate::domain::{DocumentRecord, DocumentSearchHit, DocumentSummary, NewDocument};
use crate::search::SearchFilters;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Timed out: {0}")]
    Timeout(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Inserts a new document and returns its generated identifier.
    async fn insert_document(&self, document: NewDocument) -> PortResult<Uuid>;

    /// All documents, newest first.
    async fn list_documents(&self) -> PortResult<Vec<DocumentSummary>>;

    /// At most 50 documents matching every supplied filter, newest first.
    async fn search_documents(&self, filters: &SearchFilters) -> PortResult<Vec<DocumentSearchHit>>;

    async fn get_document(&self, document_id: Uuid) -> PortResult<DocumentRecord>;

    /// Raw suggestion candidates for `query`. Callers pass them through
    /// [`crate::search::finalize_suggestions`].
    async fn suggestion_candidates(&self, query: &str) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Extracts a structured field set from the file at `path`.
    async fn extract(&self, path: &Path) -> PortResult<Map<String, Value>>;
}
