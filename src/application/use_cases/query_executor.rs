//! Query Executor
//!
//! Runs sanitized SELECT statements against the employee database and converts every
//! cell into a JSON scalar. Decoding is dialect-specific; normalization is shared:
//! temporal values become ISO-8601 strings, numbers in salary columns are rounded to two
//! decimals, NULL stays null, and everything else is rendered as a string.

use super::sql_sanitizer::SanitizedQuery;
use crate::domain::error::{AppError, Result};
use crate::domain::query::{ExecutionResult, Row as ResultRow};
use crate::infrastructure::db::pool::{acquire, DbPool};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use bigdecimal::BigDecimal;
use sqlx::{
    Column, ColumnIndex, Database, Executor, IntoArguments, Pool, Row, Statement, TypeInfo,
    ValueRef,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// A decoded cell before normalization.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(BigDecimal),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<Utc>),
    Time(NaiveTime),
    Text(String),
}

pub struct QueryExecutor {
    pool: DbPool,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Never fails past this boundary: database errors come back as a failed result.
    pub async fn execute(&self, query: &SanitizedQuery) -> ExecutionResult {
        let start = Instant::now();
        let sql = query.sql();

        let outcome = match &self.pool {
            DbPool::Postgres(pool) => fetch(pool, sql, self.query_timeout, decode_pg).await,
            DbPool::MySql(pool) => fetch(pool, sql, self.query_timeout, decode_mysql).await,
            DbPool::Sqlite(pool) => fetch(pool, sql, self.query_timeout, decode_sqlite).await,
        };

        match outcome {
            Ok((columns, rows)) => {
                let elapsed = start.elapsed();
                info!(
                    provenance = %query.provenance(),
                    rows = rows.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query executed"
                );
                ExecutionResult::succeeded(columns, rows, elapsed)
            }
            Err(e) => {
                error!(provenance = %query.provenance(), "SQL execution error: {}", e);
                let message = match e {
                    AppError::ExecutionFailed(msg) => msg,
                    other => other.to_string(),
                };
                ExecutionResult::failed(message)
            }
        }
    }
}

async fn fetch<DB>(
    pool: &Pool<DB>,
    sql: &str,
    query_timeout: Duration,
    decode: fn(&DB::Row, usize) -> RawCell,
) -> Result<(Vec<String>, Vec<ResultRow>)>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    usize: ColumnIndex<DB::Row>,
{
    let mut conn = acquire(pool).await?;

    let rows = tokio::time::timeout(query_timeout, sqlx::query(sql).fetch_all(&mut *conn))
        .await
        .map_err(|_| {
            AppError::ExecutionFailed(format!(
                "Query timed out after {} seconds",
                query_timeout.as_secs()
            ))
        })?
        .map_err(|e| AppError::ExecutionFailed(e.to_string()))?;

    let columns: Vec<String> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => match (&mut *conn).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result: {}", e);
                Vec::new()
            }
        },
    };

    let mut data = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut row_map: ResultRow = HashMap::new();
        for (i, column) in columns.iter().enumerate() {
            let is_null = row.try_get_raw(i).map(|raw| raw.is_null()).unwrap_or(true);
            let cell = if is_null { RawCell::Null } else { decode(row, i) };
            row_map.insert(column.clone(), normalize(cell, column));
        }
        data.push(row_map);
    }

    Ok((columns, data))
}

fn take<T>(
    value: std::result::Result<Option<T>, sqlx::Error>,
    wrap: impl FnOnce(T) -> RawCell,
) -> Option<RawCell> {
    value.ok().map(|v| v.map(wrap).unwrap_or(RawCell::Null))
}

fn decode_pg(row: &PgRow, index: usize) -> RawCell {
    let type_name = row.columns()[index].type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "INT2" => take(row.try_get::<Option<i16>, _>(index), |v| RawCell::Int(v.into())),
        "INT4" => take(row.try_get::<Option<i32>, _>(index), |v| RawCell::Int(v.into())),
        "INT8" => take(row.try_get::<Option<i64>, _>(index), RawCell::Int),
        "FLOAT4" => take(row.try_get::<Option<f32>, _>(index), |v| RawCell::Float(v.into())),
        "FLOAT8" => take(row.try_get::<Option<f64>, _>(index), RawCell::Float),
        "NUMERIC" => take(row.try_get::<Option<BigDecimal>, _>(index), RawCell::Decimal),
        "BOOL" => take(row.try_get::<Option<bool>, _>(index), RawCell::Bool),
        "DATE" => take(row.try_get::<Option<NaiveDate>, _>(index), RawCell::Date),
        "TIMESTAMP" => take(row.try_get::<Option<NaiveDateTime>, _>(index), RawCell::DateTime),
        "TIMESTAMPTZ" => {
            take(row.try_get::<Option<DateTime<Utc>>, _>(index), RawCell::DateTimeTz)
        }
        "TIME" => take(row.try_get::<Option<NaiveTime>, _>(index), RawCell::Time),
        _ => None,
    };

    decoded
        .or_else(|| take(row.try_get::<Option<String>, _>(index), RawCell::Text))
        .unwrap_or_else(|| {
            debug!(column_type = %type_name, "Unsupported column type, returning null");
            RawCell::Null
        })
}

fn decode_mysql(row: &MySqlRow, index: usize) -> RawCell {
    let type_name = row.columns()[index].type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "BOOLEAN" => take(row.try_get::<Option<bool>, _>(index), RawCell::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            take(row.try_get::<Option<i64>, _>(index), RawCell::Int)
        }
        name if name.ends_with(" UNSIGNED") => {
            take(row.try_get::<Option<u64>, _>(index), RawCell::UInt)
        }
        "FLOAT" => take(row.try_get::<Option<f32>, _>(index), |v| RawCell::Float(v.into())),
        "DOUBLE" => take(row.try_get::<Option<f64>, _>(index), RawCell::Float),
        "DECIMAL" => take(row.try_get::<Option<BigDecimal>, _>(index), RawCell::Decimal),
        "DATE" => take(row.try_get::<Option<NaiveDate>, _>(index), RawCell::Date),
        "DATETIME" => take(row.try_get::<Option<NaiveDateTime>, _>(index), RawCell::DateTime),
        "TIMESTAMP" => {
            take(row.try_get::<Option<DateTime<Utc>>, _>(index), RawCell::DateTimeTz)
        }
        "TIME" => take(row.try_get::<Option<NaiveTime>, _>(index), RawCell::Time),
        _ => None,
    };

    decoded
        .or_else(|| take(row.try_get::<Option<String>, _>(index), RawCell::Text))
        .or_else(|| {
            take(row.try_get::<Option<Vec<u8>>, _>(index), |bytes| {
                RawCell::Text(String::from_utf8_lossy(&bytes).into_owned())
            })
        })
        .unwrap_or(RawCell::Null)
}

fn decode_sqlite(row: &SqliteRow, index: usize) -> RawCell {
    let mut type_name = row.columns()[index].type_info().name().to_string();
    if type_name == "NULL" {
        if let Ok(raw) = row.try_get_raw(index) {
            type_name = raw.type_info().name().to_string();
        }
    }

    let decoded = match type_name.as_str() {
        "INTEGER" => take(row.try_get::<Option<i64>, _>(index), RawCell::Int),
        "REAL" | "NUMERIC" => take(row.try_get::<Option<f64>, _>(index), RawCell::Float),
        "BOOLEAN" => take(row.try_get::<Option<bool>, _>(index), RawCell::Bool),
        "DATE" => take(row.try_get::<Option<NaiveDate>, _>(index), RawCell::Date),
        "DATETIME" => take(row.try_get::<Option<NaiveDateTime>, _>(index), RawCell::DateTime)
            .or_else(|| take(row.try_get::<Option<DateTime<Utc>>, _>(index), RawCell::DateTimeTz)),
        "TIME" => take(row.try_get::<Option<NaiveTime>, _>(index), RawCell::Time),
        _ => None,
    };

    decoded
        .or_else(|| take(row.try_get_unchecked::<Option<String>, _>(index), RawCell::Text))
        .unwrap_or(RawCell::Null)
}

pub(crate) fn normalize(cell: RawCell, column: &str) -> Value {
    let is_salary = column.to_lowercase().contains("salary");
    match cell {
        RawCell::Null => Value::Null,
        RawCell::Int(n) if is_salary => round_money(n as f64),
        RawCell::UInt(n) if is_salary => round_money(n as f64),
        RawCell::Float(f) if is_salary => round_money(f),
        RawCell::Decimal(d) if is_salary => match d.to_string().parse::<f64>() {
            Ok(f) => round_money(f),
            Err(_) => Value::String(d.to_string()),
        },
        RawCell::Int(n) => Value::String(n.to_string()),
        RawCell::UInt(n) => Value::String(n.to_string()),
        RawCell::Float(f) => Value::String(f.to_string()),
        RawCell::Decimal(d) => Value::String(d.to_string()),
        RawCell::Bool(b) => Value::String(b.to_string()),
        RawCell::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        RawCell::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        RawCell::DateTimeTz(dt) => Value::String(dt.to_rfc3339()),
        RawCell::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
        RawCell::Text(s) => Value::String(s),
    }
}

fn round_money(value: f64) -> Value {
    Number::from_f64((value * 100.0).round() / 100.0)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::sql_sanitizer::SqlSanitizer;
    use crate::domain::query::GeneratedQuery;
    use crate::infrastructure::db::pool::test_support::employees_pool;
    use serde_json::json;
    use std::str::FromStr;

    fn sanitized(sql: &str) -> SanitizedQuery {
        SqlSanitizer::new("employees")
            .sanitize(&GeneratedQuery::fallback(sql))
            .unwrap()
    }

    async fn executor() -> QueryExecutor {
        QueryExecutor::new(employees_pool().await, Duration::from_secs(5))
    }

    #[test]
    fn test_normalize_salary_rounds_to_cents() {
        assert_eq!(normalize(RawCell::Float(72000.456), "salary"), json!(72000.46));
        assert_eq!(normalize(RawCell::Int(48000), "avg_salary"), json!(48000.0));
        assert_eq!(
            normalize(
                RawCell::Decimal(BigDecimal::from_str("55000.507").unwrap()),
                "Salary"
            ),
            json!(55000.51)
        );
    }

    #[test]
    fn test_normalize_other_values() {
        assert_eq!(normalize(RawCell::Int(4), "count"), json!("4"));
        assert_eq!(normalize(RawCell::Bool(true), "active"), json!("true"));
        assert_eq!(normalize(RawCell::Null, "salary"), Value::Null);
        assert_eq!(
            normalize(
                RawCell::Date(NaiveDate::from_ymd_opt(2021, 3, 15).unwrap()),
                "date_of_join"
            ),
            json!("2021-03-15")
        );
        let joined = NaiveDate::from_ymd_opt(2021, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            normalize(RawCell::DateTime(joined), "hired_at"),
            json!("2021-03-15T09:30:00")
        );
    }

    #[tokio::test]
    async fn test_execute_normalizes_rows() {
        let executor = executor().await;
        let result = executor
            .execute(&sanitized(
                "SELECT name, salary, date_of_join, email FROM employees ORDER BY name",
            ))
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.row_count, 4);
        assert_eq!(result.columns, vec!["name", "salary", "date_of_join", "email"]);

        let alice = &result.rows[0];
        assert_eq!(alice["name"], json!("Alice Johnson"));
        assert_eq!(alice["salary"], json!(72000.46));
        assert_eq!(alice["date_of_join"], json!("2021-03-15"));

        let bob = &result.rows[1];
        assert_eq!(bob["email"], Value::Null);
    }

    #[tokio::test]
    async fn test_execute_count_is_stringified() {
        let executor = executor().await;
        let result = executor
            .execute(&sanitized(
                "SELECT COUNT(*) as count FROM employees WHERE LOWER(department) LIKE '%it%'",
            ))
            .await;

        assert!(result.success);
        assert_eq!(result.rows[0]["count"], json!("2"));
    }

    #[tokio::test]
    async fn test_execute_empty_result_keeps_columns() {
        let executor = executor().await;
        let result = executor
            .execute(&sanitized(
                "SELECT name, department FROM employees WHERE salary > 1000000",
            ))
            .await;

        assert!(result.success);
        assert_eq!(result.row_count, 0);
        assert_eq!(result.columns, vec!["name", "department"]);
    }

    #[tokio::test]
    async fn test_execute_database_error_is_failed_result() {
        let executor = executor().await;
        let result = executor
            .execute(&sanitized("SELECT salray FROM employees"))
            .await;

        assert!(!result.success);
        assert!(result.rows.is_empty());
        assert!(result.error.unwrap().contains("salray"));
    }
}
