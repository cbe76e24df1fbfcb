pub mod fallback_generator;
pub mod prompt_builder;
pub mod query_cache;
pub mod query_executor;
pub mod query_use_case;
pub mod remote_generator;
pub mod schema_introspector;
pub mod sql_sanitizer;
pub mod table_inspector;
