//! services/api/src/web/ui.rs
//!
//! Serves the single-page browser shell.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET / - the upload and search page.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
