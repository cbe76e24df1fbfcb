pub mod error;
pub mod llm_config;
pub mod query;
pub mod query_log;
pub mod schema;
