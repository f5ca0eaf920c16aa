pub mod domain;
pub mod ports;
pub mod schema;
pub mod search;

pub use domain::{DocumentRecord, DocumentSearchHit, DocumentSummary, NewDocument};
pub use ports::{DatabaseService, ExtractionService, PortError, PortResult};
pub use schema::ResumeFields;
pub use search::SearchFilters;
