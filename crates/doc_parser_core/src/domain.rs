//! crates/doc_parser_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database driver or HTTP framework.

use crate::schema::ResumeFields;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A fully stored document, as returned by the detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experience: Value,
    pub education: Value,
    pub projects: Value,
    pub summary: Option<String>,
    /// The complete extraction output, kept verbatim.
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The abbreviated projection used by the listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A search result: every column except `raw_data` and `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSearchHit {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experience: Value,
    pub education: Value,
    pub projects: Value,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A document ready to be inserted. The store assigns `id` and the timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experience: Value,
    pub education: Value,
    pub projects: Value,
    pub summary: Option<String>,
    pub raw_data: Value,
}

impl NewDocument {
    /// Maps an extraction field set into the stored columns.
    ///
    /// Scalar fields are taken only when they hold a string. `skills` keeps the string
    /// elements of the array and drops anything else. The three structured collections
    /// fall back to an empty array when absent or not an array. The whole map is kept
    /// as `raw_data`, so nothing the extractor returned is lost.
    pub fn from_extraction(filename: impl Into<String>, fields: Map<String, Value>) -> Self {
        let typed = ResumeFields::from_map(&fields);

        Self {
            filename: filename.into(),
            name: typed.name,
            email: typed.email,
            phone: typed.phone,
            location: typed.location,
            skills: typed.skills,
            experience: Value::Array(typed.experience),
            education: Value::Array(typed.education),
            projects: Value::Array(typed.projects),
            summary: typed.summary,
            raw_data: Value::Object(fields),
        }
    }
}
