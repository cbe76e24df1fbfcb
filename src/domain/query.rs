use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// Which generator produced a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Remote(String),
    Fallback,
    /// Fixed statements issued by the table inspection command.
    Inspection,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Remote(model) => write!(f, "remote:{}", model),
            Provenance::Fallback => write!(f, "fallback"),
            Provenance::Inspection => write!(f, "inspection"),
        }
    }
}

/// Candidate SQL straight out of a generator. Must pass the sanitizer before it can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    sql: String,
    provenance: Provenance,
}

impl GeneratedQuery {
    pub fn remote(model: &str, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            provenance: Provenance::Remote(model.to_string()),
        }
    }

    pub fn fallback(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            provenance: Provenance::Fallback,
        }
    }

    pub fn inspection(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            provenance: Provenance::Inspection,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}

pub type Row = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub execution_time: Duration,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(columns: Vec<String>, rows: Vec<Row>, execution_time: Duration) -> Self {
        Self {
            success: true,
            row_count: rows.len(),
            rows,
            columns,
            execution_time,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            rows: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
            execution_time: Duration::ZERO,
            error: Some(error.into()),
        }
    }
}

/// Body of a natural-language query request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueryRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 4096))]
    pub query: String,
}

/// Payload returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub original_query: String,
    pub sql_query: Option<String>,
    pub data: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn from_execution(original_query: &str, sql: &str, result: ExecutionResult) -> Self {
        Self {
            success: result.success,
            original_query: original_query.to_string(),
            sql_query: Some(sql.to_string()),
            data: result.rows,
            columns: result.columns,
            row_count: result.row_count,
            cached: false,
            error: if result.success {
                None
            } else {
                Some(result.error.unwrap_or_else(|| "Unknown error".to_string()))
            },
        }
    }

    pub fn failure(original_query: &str, sql_query: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            original_query: original_query.to_string(),
            sql_query,
            data: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
            cached: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_tags() {
        assert_eq!(
            GeneratedQuery::remote("google/gemma-7b-it:free", "SELECT 1")
                .provenance()
                .to_string(),
            "remote:google/gemma-7b-it:free"
        );
        assert_eq!(Provenance::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_failed_execution_maps_to_error_field() {
        let response = QueryResponse::from_execution(
            "show salaries",
            "SELECT salray FROM employees;",
            ExecutionResult::failed("no such column: salray"),
        );
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("no such column: salray"));
        assert_eq!(response.sql_query.as_deref(), Some("SELECT salray FROM employees;"));
    }

    #[test]
    fn test_error_omitted_from_json_on_success() {
        let response = QueryResponse::from_execution(
            "list",
            "SELECT name FROM employees;",
            ExecutionResult::succeeded(vec!["name".into()], Vec::new(), Duration::ZERO),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["cached"], false);
    }
}
