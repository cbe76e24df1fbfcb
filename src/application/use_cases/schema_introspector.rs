//! Schema Introspector
//!
//! Reads the employee table's column list from the live catalog and turns it into a
//! [`SchemaDescription`]. Each engine has its own catalog dialect:
//! - PostgreSQL: `information_schema.columns`
//! - MySQL: `SHOW COLUMNS` (the `DESCRIBE` form)
//! - SQLite: `PRAGMA table_info`
//!
//! Failures never reach the caller of [`SchemaIntrospector::describe`]; they degrade to the
//! configured fallback text. A live description is kept for the life of the process.

use crate::domain::error::{AppError, Result};
use crate::domain::schema::{ColumnDescriptor, SchemaDescription};
use crate::infrastructure::db::pool::{acquire, is_valid_identifier, DbPool};
use sqlx::mysql::MySqlRow;
use sqlx::{ColumnIndex, Database, Executor, FromRow, IntoArguments, Pool, Row};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct SchemaIntrospector {
    pool: DbPool,
    table: String,
    fallback_text: String,
    cached: RwLock<Option<SchemaDescription>>,
}

impl SchemaIntrospector {
    pub fn new(pool: DbPool, table: &str, fallback_text: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
            fallback_text: fallback_text.to_string(),
            cached: RwLock::new(None),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Live description if the catalog is readable, otherwise the degraded fallback.
    pub async fn describe(&self) -> SchemaDescription {
        if let Some(schema) = self.cached.read().await.as_ref() {
            return schema.clone();
        }

        match self.introspect().await {
            Ok(schema) => {
                info!(
                    table = %self.table,
                    columns = schema.columns.len(),
                    db_type = self.pool.db_type().as_str(),
                    "Schema introspected"
                );
                *self.cached.write().await = Some(schema.clone());
                schema
            }
            Err(e) => {
                warn!(table = %self.table, "Error getting schema info: {}", e);
                SchemaDescription::degraded(&self.table, &self.fallback_text)
            }
        }
    }

    /// Reads columns, row count and sample departments. Errors are returned as-is.
    pub async fn introspect(&self) -> Result<SchemaDescription> {
        let columns = self.columns().await?;
        if columns.is_empty() {
            return Err(AppError::DatabaseError(format!(
                "Table '{}' has no columns or does not exist",
                self.table
            )));
        }
        let row_count = self.row_count().await?;

        let has_department = columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case("department"));
        let departments = if has_department {
            self.sample_departments(10).await.unwrap_or_else(|e| {
                debug!("Skipping sample departments: {}", e);
                Vec::new()
            })
        } else {
            Vec::new()
        };

        Ok(SchemaDescription::live(
            &self.table,
            self.pool.db_type(),
            columns,
            Some(row_count),
            departments,
        ))
    }

    pub async fn table_exists(&self) -> Result<bool> {
        self.checked_table()?;
        let found = match &self.pool {
            DbPool::Postgres(pool) => {
                let mut conn = acquire(pool).await?;
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
                )
                .bind(&self.table)
                .fetch_one(&mut *conn)
                .await
            }
            DbPool::MySql(pool) => {
                let mut conn = acquire(pool).await?;
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
                )
                .bind(&self.table)
                .fetch_one(&mut *conn)
                .await
                .map(|n| n > 0)
            }
            DbPool::Sqlite(pool) => {
                let mut conn = acquire(pool).await?;
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                )
                .bind(&self.table)
                .fetch_one(&mut *conn)
                .await
                .map(|n| n > 0)
            }
        };
        found.map_err(|e| AppError::DatabaseError(format!("Failed to check table: {}", e)))
    }

    /// Columns in catalog order.
    pub async fn columns(&self) -> Result<Vec<ColumnDescriptor>> {
        let table = self.checked_table()?;
        let map_err = |e: sqlx::Error| {
            AppError::DatabaseError(format!("Failed to read columns of '{}': {}", table, e))
        };

        match &self.pool {
            DbPool::Postgres(pool) => {
                let mut conn = acquire(pool).await?;
                let rows = sqlx::query_as::<_, (String, String, String)>(
                    "SELECT column_name::text, data_type::text, is_nullable::text
                     FROM information_schema.columns
                     WHERE table_name = $1
                     ORDER BY ordinal_position",
                )
                .bind(table)
                .fetch_all(&mut *conn)
                .await
                .map_err(map_err)?;

                Ok(rows
                    .into_iter()
                    .map(|(name, declared_type, is_nullable)| ColumnDescriptor {
                        name,
                        declared_type,
                        nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    })
                    .collect())
            }
            DbPool::MySql(pool) => {
                let mut conn = acquire(pool).await?;
                let rows = sqlx::query(&format!("SHOW COLUMNS FROM `{}`", table))
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(map_err)?;

                Ok(rows
                    .iter()
                    .map(|row| ColumnDescriptor {
                        name: mysql_text(row, "Field"),
                        declared_type: mysql_text(row, "Type"),
                        nullable: mysql_text(row, "Null").eq_ignore_ascii_case("YES"),
                    })
                    .collect())
            }
            DbPool::Sqlite(pool) => {
                let mut conn = acquire(pool).await?;
                let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(map_err)?;

                rows.iter()
                    .map(|row| {
                        let name: String = row.try_get("name")?;
                        let declared_type: String = row.try_get("type")?;
                        let not_null: i64 = row.try_get("notnull")?;
                        Ok(ColumnDescriptor {
                            name,
                            declared_type,
                            nullable: not_null == 0,
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
                    .map_err(map_err)
            }
        }
    }

    pub async fn row_count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.checked_table()?);
        let counts: Vec<i64> = match &self.pool {
            DbPool::Postgres(pool) => fetch_column(pool, &sql).await?,
            DbPool::MySql(pool) => fetch_column(pool, &sql).await?,
            DbPool::Sqlite(pool) => fetch_column(pool, &sql).await?,
        };
        Ok(counts.into_iter().next().unwrap_or(0))
    }

    /// Up to `limit` distinct non-null departments.
    pub async fn sample_departments(&self, limit: u32) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT department FROM {} WHERE department IS NOT NULL LIMIT {}",
            self.checked_table()?,
            limit
        );
        match &self.pool {
            DbPool::Postgres(pool) => fetch_column(pool, &sql).await,
            DbPool::MySql(pool) => fetch_column(pool, &sql).await,
            DbPool::Sqlite(pool) => fetch_column(pool, &sql).await,
        }
    }

    fn checked_table(&self) -> Result<&str> {
        if is_valid_identifier(&self.table) {
            Ok(&self.table)
        } else {
            Err(AppError::ValidationError(format!(
                "Invalid table name '{}'",
                self.table
            )))
        }
    }
}

/// MySQL may report catalog text as binary depending on collation.
fn mysql_text(row: &MySqlRow, column: &str) -> String {
    row.try_get::<String, _>(column)
        .or_else(|_| {
            row.try_get::<Vec<u8>, _>(column)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        })
        .unwrap_or_default()
}

async fn fetch_column<DB, T>(pool: &Pool<DB>, sql: &str) -> Result<Vec<T>>
where
    DB: Database,
    T: Send + Unpin,
    (T,): for<'r> FromRow<'r, DB::Row>,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    usize: ColumnIndex<DB::Row>,
{
    let mut conn = acquire(pool).await?;
    sqlx::query_scalar::<DB, T>(sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Catalog query failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{SchemaSource, DbType, DEFAULT_SCHEMA_TEXT};
    use crate::infrastructure::db::pool::test_support::{employees_pool, memory_pool};

    #[tokio::test]
    async fn test_introspect_sqlite_table() {
        let introspector =
            SchemaIntrospector::new(employees_pool().await, "employees", DEFAULT_SCHEMA_TEXT);
        let schema = introspector.describe().await;

        assert_eq!(schema.source, SchemaSource::Live(DbType::Sqlite));
        assert_eq!(schema.row_count, Some(4));
        assert_eq!(schema.columns[0].name, "id");
        assert_eq!(schema.columns[1].name, "name");
        assert!(!schema.columns[1].nullable);
        assert!(schema.columns[2].nullable);

        let mut departments = schema.sample_departments.clone();
        departments.sort();
        assert_eq!(departments, vec!["HR", "IT", "Sales"]);

        assert_eq!(schema.presence.join_dates, vec!["date_of_join"]);
        assert!(schema.presence.salary);

        let text = schema.render();
        assert!(text.contains("- salary (REAL): NULL"));
        assert!(text.contains("Table contains 4 employee records."));
    }

    #[tokio::test]
    async fn test_missing_table_degrades() {
        let introspector =
            SchemaIntrospector::new(memory_pool().await, "employees", DEFAULT_SCHEMA_TEXT);
        let schema = introspector.describe().await;
        assert_eq!(schema.source, SchemaSource::Default);
        assert!(schema.render().contains("(common fields)"));
        assert!(!introspector.table_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_table_name_degrades_without_querying() {
        let introspector = SchemaIntrospector::new(
            employees_pool().await,
            "employees; DROP TABLE employees",
            DEFAULT_SCHEMA_TEXT,
        );
        assert!(introspector.introspect().await.is_err());
        assert!(!introspector.describe().await.is_live());
        assert!(introspector.table_exists().await.is_err());
    }

    #[tokio::test]
    async fn test_live_schema_is_cached() {
        let pool = employees_pool().await;
        let introspector = SchemaIntrospector::new(pool.clone(), "employees", DEFAULT_SCHEMA_TEXT);
        assert_eq!(introspector.describe().await.row_count, Some(4));

        if let DbPool::Sqlite(sqlite) = &pool {
            sqlx::query("DELETE FROM employees").execute(sqlite).await.unwrap();
        }
        assert_eq!(introspector.describe().await.row_count, Some(4));
        assert!(introspector.table_exists().await.unwrap());
    }
}
