//! services/api/src/adapters/search_query.rs
//!
//! Assembles the parameterized search statement over the `documents` table.
//! User terms only ever reach the database as bind parameters.

use doc_parser_core::search::{contains_pattern, SearchFilters, SEARCH_LIMIT};
use sqlx::{Postgres, QueryBuilder};

/// Columns returned by a search: everything except `raw_data` and `updated_at`.
pub const SEARCH_COLUMNS: &str = "id, filename, name, email, phone, location, skills, \
     experience, education, projects, summary, created_at";

/// JSON columns that are searched through their text form.
const JSON_TEXT_FILTERS: [&str; 3] = ["experience", "education", "projects"];

/// Builds the search query for `filters`.
///
/// Every supplied term becomes one condition; conditions are joined with `AND`.
/// With no terms the statement has no `WHERE` clause and returns the newest rows.
pub fn build_search_query(filters: &SearchFilters) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM documents", SEARCH_COLUMNS));
    let mut has_condition = false;

    let mut next_condition = |builder: &mut QueryBuilder<'static, Postgres>| {
        builder.push(if has_condition { " AND " } else { " WHERE " });
        has_condition = true;
    };

    if let Some(text) = filters.text() {
        let pattern = contains_pattern(text);
        next_condition(&mut builder);
        builder
            .push("(name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR summary ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(skill) = filters.skills() {
        next_condition(&mut builder);
        builder
            .push("EXISTS (SELECT 1 FROM unnest(skills) AS skill WHERE skill ILIKE ")
            .push_bind(contains_pattern(skill))
            .push(")");
    }

    let json_terms = [filters.experience(), filters.education(), filters.projects()];
    for (column, term) in JSON_TEXT_FILTERS.iter().zip(json_terms) {
        if let Some(term) = term {
            next_condition(&mut builder);
            builder
                .push(format!("{}::text ILIKE ", column))
                .push_bind(contains_pattern(term));
        }
    }

    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(SEARCH_LIMIT);
    builder
}
