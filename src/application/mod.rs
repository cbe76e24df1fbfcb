pub mod use_cases;

pub use use_cases::query_cache::{InMemoryQueryCache, QueryCache};
pub use use_cases::query_use_case::QueryUseCase;
pub use use_cases::table_inspector::{TableInspector, TableReport};
