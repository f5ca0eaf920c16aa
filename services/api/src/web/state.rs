//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use doc_parser_core::ports::{DatabaseService, ExtractionService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub extractor: Arc<dyn ExtractionService>,
    pub config: Arc<Config>,
}
