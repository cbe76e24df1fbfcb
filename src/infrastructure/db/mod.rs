pub mod pool;
pub mod query_logs;
