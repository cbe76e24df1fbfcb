use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One appended record per top-level query request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: Option<i64>,
    pub original_query: String,
    pub generated_sql: String,
    pub success: bool,
    pub error_message: Option<String>,
    /// Seconds.
    pub execution_time: f64,
    pub result_count: i64,
    pub cached: bool,
    pub timestamp: DateTime<Utc>,
}

impl QueryLogEntry {
    pub fn new(
        original_query: &str,
        generated_sql: Option<&str>,
        success: bool,
        error_message: Option<String>,
        execution_time: f64,
        result_count: usize,
        cached: bool,
    ) -> Self {
        Self {
            id: None,
            original_query: original_query.to_string(),
            generated_sql: generated_sql.unwrap_or_default().to_string(),
            success,
            error_message: error_message.filter(|msg| !msg.is_empty()),
            execution_time,
            result_count: result_count as i64,
            cached,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only sink for query history.
#[async_trait::async_trait]
pub trait QueryLogSink: Send + Sync {
    async fn create(&self, entry: &QueryLogEntry) -> crate::domain::error::Result<()>;
}
