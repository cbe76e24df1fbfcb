use crate::domain::error::{AppError, Result};
use crate::domain::query_log::{QueryLogEntry, QueryLogSink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const QUERY_LOG_SCHEMA: &str = include_str!("../../resources/query_logs.sql");

pub struct QueryLogRepository {
    pool: SqlitePool,
}

impl QueryLogRepository {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let db_url = db_path_to_url(db_path)?;
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| AppError::DatabaseError(format!("Failed to parse query log DB URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect query log DB: {e}")))?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        apply_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn insert(&self, entry: &QueryLogEntry) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO query_logs (original_query, generated_sql, success, error_message, execution_time, result_count, cached, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.original_query)
        .bind(&entry.generated_sql)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(entry.execution_time)
        .bind(entry.result_count)
        .bind(entry.cached)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert query log: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Newest first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<QueryLogEntry>> {
        let limit = limit.clamp(1, 500);
        sqlx::query_as::<_, QueryLogEntity>(
            "SELECT id, original_query, generated_sql, success, error_message, execution_time, result_count, cached, timestamp
             FROM query_logs ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list query logs: {e}")))
        .map(|entities| entities.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl QueryLogSink for QueryLogRepository {
    async fn create(&self, entry: &QueryLogEntry) -> Result<()> {
        self.insert(entry).await.map(|_| ())
    }
}

#[derive(sqlx::FromRow)]
struct QueryLogEntity {
    id: i64,
    original_query: String,
    generated_sql: String,
    success: bool,
    error_message: Option<String>,
    execution_time: f64,
    result_count: i64,
    cached: bool,
    timestamp: DateTime<Utc>,
}

impl From<QueryLogEntity> for QueryLogEntry {
    fn from(e: QueryLogEntity) -> Self {
        Self {
            id: Some(e.id),
            original_query: e.original_query,
            generated_sql: e.generated_sql,
            success: e.success,
            error_message: e.error_message,
            execution_time: e.execution_time,
            result_count: e.result_count,
            cached: e.cached,
            timestamp: e.timestamp,
        }
    }
}

fn db_path_to_url(db_path: &Path) -> Result<String> {
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| AppError::ValidationError("Query log DB path is not valid UTF-8".to_string()))?;
    Ok(format!("sqlite://{}", db_path_str.replace('\\', "/")))
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in QUERY_LOG_SCHEMA.split(';') {
        let stmt = statement.trim();
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to apply query log schema: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_repository() -> QueryLogRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    QueryLogRepository::with_pool(pool).await.expect("query log schema")
}
