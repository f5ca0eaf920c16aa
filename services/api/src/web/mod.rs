pub mod rest;
pub mod state;
pub mod ui;
pub mod upload;

pub use rest::{get_document_handler, list_documents_handler, search_handler, suggest_handler};
pub use ui::index_handler;
pub use upload::upload_handler;

use crate::config::{Config, ConfigError};
use crate::web::{rest::ApiDoc, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// The CORS policy: a single configured origin, or any origin when none is set.
fn cors_layer(config: &Config) -> Result<CorsLayer, ConfigError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    match &config.cors_allowed_origin {
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>().map_err(|e| {
                ConfigError::InvalidValue("CORS_ALLOWED_ORIGIN".to_string(), e.to_string())
            })?;
            Ok(cors.allow_origin(origin))
        }
        None => Ok(cors.allow_origin(Any)),
    }
}

/// Builds the complete application router: UI shell, JSON API and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ConfigError> {
    let cors = cors_layer(&app_state.config)?;
    let body_limit = app_state.config.max_upload_bytes;

    let api_router = Router::new()
        .route("/", get(index_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/search", get(search_handler))
        .route("/api/documents", get(list_documents_handler))
        .route("/api/document/{id}", get(get_document_handler))
        .route("/api/suggest", get(suggest_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
