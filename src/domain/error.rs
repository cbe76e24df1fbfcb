use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    EmptyInput,
    MalformedRequest(String),
    ValidationError(String),
    SanitizationRejected(String),
    ExecutionFailed(String),
    LLMError(String),
    DatabaseError(String),
    ConfigError(String),
    Internal(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EmptyInput => write!(f, "Query cannot be empty"),
            AppError::MalformedRequest(msg) => write!(f, "Malformed request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::SanitizationRejected(msg) => write!(f, "Generated SQL rejected: {}", msg),
            AppError::ExecutionFailed(msg) => write!(f, "{}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_is_prefixed() {
        let err = AppError::SanitizationRejected("Only SELECT statements are allowed".into());
        assert_eq!(
            err.to_string(),
            "Generated SQL rejected: Only SELECT statements are allowed"
        );
    }

    #[test]
    fn test_execution_failure_is_verbatim() {
        let err = AppError::ExecutionFailed("no such column: salray".into());
        assert_eq!(err.to_string(), "no such column: salray");
    }
}
