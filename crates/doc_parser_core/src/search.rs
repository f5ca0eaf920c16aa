//! crates/doc_parser_core/src/search.rs
//!
//! Search inputs and the store-independent parts of search and suggestion handling.

use serde::Deserialize;
use std::collections::BTreeSet;

/// Maximum number of rows a search returns.
pub const SEARCH_LIMIT: i64 = 50;

/// Maximum number of suggestions returned to the client.
pub const SUGGESTION_LIMIT: usize = 10;

/// Optional search terms. Every supplied term must match (logical AND).
///
/// Terms are trimmed on access; a blank term counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchFilters {
    /// Free text matched against name, email and summary.
    #[serde(rename = "q")]
    pub text: Option<String>,
    /// Matched when any element of the skills list contains it.
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub projects: Option<String>,
}

impl SearchFilters {
    pub fn text(&self) -> Option<&str> {
        normalize(&self.text)
    }

    pub fn skills(&self) -> Option<&str> {
        normalize(&self.skills)
    }

    pub fn experience(&self) -> Option<&str> {
        normalize(&self.experience)
    }

    pub fn education(&self) -> Option<&str> {
        normalize(&self.education)
    }

    pub fn projects(&self) -> Option<&str> {
        normalize(&self.projects)
    }

    /// True when no term is supplied, in which case a search returns the newest documents.
    pub fn is_empty(&self) -> bool {
        self.text().is_none()
            && self.skills().is_none()
            && self.experience().is_none()
            && self.education().is_none()
            && self.projects().is_none()
    }
}

fn normalize(term: &Option<String>) -> Option<&str> {
    term.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// Escapes `\`, `%` and `_` so the term matches literally inside a LIKE pattern.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// LIKE pattern for "contains `term`".
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// LIKE pattern for "starts with `term`".
pub fn prefix_pattern(term: &str) -> String {
    format!("{}%", escape_like(term))
}

/// Trims, drops blanks, deduplicates and sorts the candidates, keeping the first `limit`.
pub fn finalize_suggestions<I>(candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(limit)
        .collect()
}
