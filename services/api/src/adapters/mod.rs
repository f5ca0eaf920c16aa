pub mod db;
pub mod llama_extract;
pub mod search_query;

pub use db::DbAdapter;
pub use llama_extract::LlamaExtractAdapter;
pub use search_query::build_search_query;
