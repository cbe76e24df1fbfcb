//! Connection pool for the employee database
//!
//! One pool per process, opened from the configured URL. The engine is chosen by URL
//! scheme and fixes which catalog dialect the introspector speaks. Callers borrow a
//! connection per operation; it goes back to the pool when dropped.

use crate::domain::error::{AppError, Result};
use crate::domain::schema::DbType;
use crate::infrastructure::config::DatabaseConfig;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Database, Pool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub enum DbPool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db_type = Self::detect(&config.url)?;
        let acquire_timeout = Duration::from_secs(config.connect_timeout_secs);

        let pool = match db_type {
            DbType::Postgres => PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(&config.url)
                .await
                .map(DbPool::Postgres),
            DbType::MySql => MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(acquire_timeout)
                .connect(&config.url)
                .await
                .map(DbPool::MySql),
            DbType::Sqlite => {
                let options = SqliteConnectOptions::from_str(&config.url).map_err(|e| {
                    AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
                })?;
                SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(options)
                    .await
                    .map(DbPool::Sqlite)
            }
        }
        .map_err(|e| {
            error!(db_type = db_type.as_str(), "Failed to connect to employee database: {}", e);
            AppError::DatabaseError(format!("Failed to connect: {}", e))
        })?;

        info!(db_type = db_type.as_str(), "Connected to employee database");
        Ok(pool)
    }

    /// Engine for a connection URL, by scheme.
    pub fn detect(url: &str) -> Result<DbType> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(DbType::Postgres),
            "mysql" | "mariadb" => Ok(DbType::MySql),
            "sqlite" => Ok(DbType::Sqlite),
            other => Err(AppError::ConfigError(format!(
                "Unsupported database URL scheme '{}'",
                other
            ))),
        }
    }

    pub fn db_type(&self) -> DbType {
        match self {
            DbPool::Postgres(_) => DbType::Postgres,
            DbPool::MySql(_) => DbType::MySql,
            DbPool::Sqlite(_) => DbType::Sqlite,
        }
    }

    pub async fn close(&self) {
        match self {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Borrows a connection for the duration of one operation.
pub(crate) async fn acquire<DB: Database>(pool: &Pool<DB>) -> Result<PoolConnection<DB>> {
    pool.acquire()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))
}

/// Plain `[A-Za-z_][A-Za-z0-9_]*` identifier, safe to splice into catalog statements.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DbPool;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single-connection in-memory database so every query sees the same data.
    pub async fn memory_pool() -> DbPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        DbPool::Sqlite(pool)
    }

    pub async fn employees_pool() -> DbPool {
        let db = memory_pool().await;
        let DbPool::Sqlite(pool) = &db else {
            unreachable!()
        };
        for stmt in [
            "CREATE TABLE employees (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                department TEXT,
                salary REAL,
                date_of_join DATE,
                email TEXT,
                position TEXT
            )",
            "INSERT INTO employees (name, department, salary, date_of_join, email, position) VALUES
                ('Alice Johnson', 'IT', 72000.456, '2021-03-15', 'alice@example.com', 'Engineer'),
                ('Bob Smith', 'HR', 48000, '2019-07-01', NULL, 'Recruiter'),
                ('Carol White', 'Sales', 55000.5, '2023-01-20', 'carol@example.com', NULL),
                ('Dan Brown', 'IT', 91000, '2018-11-05', 'dan@example.com', 'Architect')",
        ] {
            sqlx::query(stmt).execute(pool).await.expect("seed employees");
        }
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_scheme() {
        assert_eq!(DbPool::detect("postgres://u@h/db").unwrap(), DbType::Postgres);
        assert_eq!(DbPool::detect("postgresql://u@h/db").unwrap(), DbType::Postgres);
        assert_eq!(DbPool::detect("mysql://u@h/db").unwrap(), DbType::MySql);
        assert_eq!(DbPool::detect("sqlite://employees.db").unwrap(), DbType::Sqlite);
        assert_eq!(DbPool::detect("sqlite::memory:").unwrap(), DbType::Sqlite);
        assert!(DbPool::detect("oracle://x").is_err());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("employees"));
        assert!(is_valid_identifier("_staff_2024"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2024_staff"));
        assert!(!is_valid_identifier("employees; DROP TABLE x"));
        assert!(!is_valid_identifier("emp-loyees"));
    }
}
