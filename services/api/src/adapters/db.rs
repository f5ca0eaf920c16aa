//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every operation checks a connection out of the pool for its own duration; the
//! connection goes back to the pool when it is dropped, whichever way the call ends.

use crate::adapters::search_query::build_search_query;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doc_parser_core::domain::{DocumentRecord, DocumentSearchHit, DocumentSummary, NewDocument};
use doc_parser_core::ports::{DatabaseService, PortError, PortResult};
use doc_parser_core::search::{contains_pattern, prefix_pattern, SearchFilters, SUGGESTION_LIMIT};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

/// JSON columns whose string leaves feed the suggestion list.
const SUGGESTION_JSON_COLUMNS: [&str; 3] = ["experience", "education", "projects"];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    filename: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    location: Option<String>,
    skills: Option<Vec<String>>,
    experience: Option<Value>,
    education: Option<Value>,
    projects: Option<Value>,
    summary: Option<String>,
    raw_data: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl DocumentRow {
    fn to_domain(self) -> DocumentRecord {
        DocumentRecord {
            id: self.id,
            filename: self.filename,
            name: self.name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            skills: self.skills.unwrap_or_default(),
            experience: json_list(self.experience),
            education: json_list(self.education),
            projects: json_list(self.projects),
            summary: self.summary,
            raw_data: self.raw_data.unwrap_or_else(|| Value::Object(Default::default())),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    filename: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    location: Option<String>,
    skills: Option<Vec<String>>,
    created_at: DateTime<Utc>,
}
impl SummaryRow {
    fn to_domain(self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            filename: self.filename,
            name: self.name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            skills: self.skills.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SearchRow {
    id: Uuid,
    filename: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    location: Option<String>,
    skills: Option<Vec<String>>,
    experience: Option<Value>,
    education: Option<Value>,
    projects: Option<Value>,
    summary: Option<String>,
    created_at: DateTime<Utc>,
}
impl SearchRow {
    fn to_domain(self) -> DocumentSearchHit {
        DocumentSearchHit {
            id: self.id,
            filename: self.filename,
            name: self.name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            skills: self.skills.unwrap_or_default(),
            experience: json_list(self.experience),
            education: json_list(self.education),
            projects: json_list(self.projects),
            summary: self.summary,
            created_at: self.created_at,
        }
    }
}

/// A JSON collection column; rows written before the column had a default read as `[]`.
fn json_list(value: Option<Value>) -> Value {
    match value {
        Some(Value::Null) | None => Value::Array(Vec::new()),
        Some(Value::String(text)) => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        Some(other) => other,
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn insert_document(&self, document: NewDocument) -> PortResult<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO documents
                (filename, name, email, phone, location, skills, experience, education, projects, summary, raw_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(document.filename)
        .bind(document.name)
        .bind(document.email)
        .bind(document.phone)
        .bind(document.location)
        .bind(document.skills)
        .bind(document.experience)
        .bind(document.education)
        .bind(document.projects)
        .bind(document.summary)
        .bind(document.raw_data)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(id)
    }

    async fn list_documents(&self) -> PortResult<Vec<DocumentSummary>> {
        let records = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, filename, name, email, phone, location, skills, created_at FROM documents ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn search_documents(&self, filters: &SearchFilters) -> PortResult<Vec<DocumentSearchHit>> {
        let mut builder = build_search_query(filters);
        debug!(sql = builder.sql(), "Running document search");

        let records = builder
            .build_query_as::<SearchRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<DocumentRecord> {
        let record = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, filename, name, email, phone, location, skills, experience, education,
                   projects, summary, raw_data, created_at, updated_at
            FROM documents WHERE id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;

        Ok(record.to_domain())
    }

    async fn suggestion_candidates(&self, query: &str) -> PortResult<Vec<String>> {
        let limit = SUGGESTION_LIMIT as i64;
        let prefix = prefix_pattern(query);
        let contains = contains_pattern(query);

        // One connection serves every lookup and is returned when `conn` drops.
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;
        let mut candidates = Vec::new();

        let names: Vec<Option<String>> = sqlx::query_scalar(
            "SELECT DISTINCT name FROM documents WHERE name ILIKE $1 ORDER BY name LIMIT $2",
        )
        .bind(prefix.as_str())
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(unexpected)?;
        candidates.extend(names.into_iter().flatten());

        let emails: Vec<Option<String>> = sqlx::query_scalar(
            "SELECT DISTINCT email FROM documents WHERE email ILIKE $1 ORDER BY email LIMIT $2",
        )
        .bind(prefix.as_str())
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(unexpected)?;
        candidates.extend(emails.into_iter().flatten());

        let skills: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT skill FROM documents, unnest(skills) AS skill \
             WHERE skill ILIKE $1 ORDER BY skill LIMIT $2",
        )
        .bind(contains.as_str())
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(unexpected)?;
        candidates.extend(skills);

        // Only string leaves are matched, never keys or serialized JSON text.
        for column in SUGGESTION_JSON_COLUMNS {
            let leaves: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT DISTINCT leaf #>> '{{}}' AS leaf_text \
                 FROM documents, jsonb_path_query(documents.{column}, 'strict $.**') AS leaf \
                 WHERE jsonb_typeof(leaf) = 'string' AND leaf #>> '{{}}' ILIKE $1 \
                 ORDER BY leaf_text LIMIT $2"
            ))
            .bind(contains.as_str())
            .bind(limit)
            .fetch_all(&mut *conn)
            .await
            .map_err(unexpected)?;
            candidates.extend(leaves);
        }

        Ok(candidates)
    }
}
