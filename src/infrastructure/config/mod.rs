//! Process configuration
//!
//! Loaded once at startup: built-in defaults, then an optional TOML file, then
//! `DATAFABRIC_*` environment variables (`__` separates nested keys). The result is
//! immutable and handed to constructors by value or behind an `Arc`.

use crate::domain::error::Result;
use crate::domain::llm_config::RemoteModelConfig;
use crate::domain::schema::DEFAULT_SCHEMA_TEXT;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "datafabric.toml";
pub const ENV_PREFIX: &str = "DATAFABRIC_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://`, `mysql://` or `sqlite:` URL of the employee database.
    pub url: String,
    pub table: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub query_timeout_secs: u64,
    /// Schema text handed to the model when the catalog cannot be read.
    pub fallback_schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://employees.db".to_string(),
            table: "employees".to_string(),
            max_connections: 5,
            connect_timeout_secs: 10,
            query_timeout_secs: 30,
            fallback_schema: DEFAULT_SCHEMA_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogConfig {
    pub path: PathBuf,
}

impl Default for QueryLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("query_logs.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub remote: RemoteModelConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub query_log: QueryLogConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Reads `.env`, the config file named by `DATAFABRIC_CONFIG` (or `datafabric.toml`),
    /// and the environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var("DATAFABRIC_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let figment = Self::figment()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let mut config: AppConfig = figment.extract()?;

        if config.remote.credential().is_none() {
            config.remote.api_key = std::env::var("OPENROUTER_API_KEY").ok();
        }
        Ok(config)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig {
            log_filter: default_log_filter(),
            ..AppConfig::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: AppConfig = AppConfig::figment().extract().unwrap();
        assert_eq!(config.database.table, "employees");
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.models.len(), 3);
        assert_eq!(config.log_filter, "info");
        assert!(config.remote.credential().is_none());
    }

    #[test]
    fn test_toml_overrides_nested_keys() {
        let toml = r#"
            log_filter = "debug"

            [database]
            url = "postgres://reader@localhost/hr"
            table = "staff"

            [remote]
            api_key = "sk-or-test"
            models = ["openai/gpt-4o-mini"]
        "#;
        let config: AppConfig = AppConfig::figment()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.database.url, "postgres://reader@localhost/hr");
        assert_eq!(config.database.table, "staff");
        assert_eq!(config.database.query_timeout_secs, 30);
        assert_eq!(config.remote.credential(), Some("sk-or-test"));
        assert_eq!(config.remote.models, vec!["openai/gpt-4o-mini".to_string()]);
        assert_eq!(config.remote.max_tokens, 200);
        assert_eq!(config.log_filter, "debug");
    }
}
