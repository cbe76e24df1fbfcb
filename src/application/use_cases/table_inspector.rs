//! Table Inspector
//!
//! Operator view of the employee table: structure, record count, sample rows, department
//! list and salary range. Catalog reads go through the introspector; data reads are fixed
//! SELECTs that still pass the sanitizer before execution.

use super::query_executor::QueryExecutor;
use super::schema_introspector::SchemaIntrospector;
use super::sql_sanitizer::SqlSanitizer;
use crate::domain::error::{AppError, Result};
use crate::domain::query::{ExecutionResult, GeneratedQuery};
use crate::domain::schema::ColumnDescriptor;
use serde_json::Value;
use std::fmt::Write;
use tracing::warn;

const MAX_LISTED_DEPARTMENTS: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone)]
pub struct TableReport {
    pub table: String,
    pub exists: bool,
    pub columns: Vec<ColumnDescriptor>,
    pub row_count: i64,
    pub sample_size: u32,
    /// `None` when the table is empty.
    pub sample: Option<ExecutionResult>,
    /// `None` when the table has no readable department column.
    pub departments: Option<Vec<String>>,
    pub salary_range: Option<SalaryRange>,
}

pub struct TableInspector {
    introspector: SchemaIntrospector,
    sanitizer: SqlSanitizer,
    executor: QueryExecutor,
}

impl TableInspector {
    pub fn new(
        introspector: SchemaIntrospector,
        sanitizer: SqlSanitizer,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            introspector,
            sanitizer,
            executor,
        }
    }

    pub async fn inspect(&self, sample_size: u32) -> Result<TableReport> {
        let table = self.introspector.table().to_string();
        let mut report = TableReport {
            table: table.clone(),
            exists: false,
            columns: Vec::new(),
            row_count: 0,
            sample_size,
            sample: None,
            departments: None,
            salary_range: None,
        };

        report.exists = self.introspector.table_exists().await?;
        if !report.exists {
            return Ok(report);
        }

        report.columns = self.introspector.columns().await?;
        report.row_count = self.introspector.row_count().await?;
        if report.row_count == 0 {
            return Ok(report);
        }

        let sample = self
            .run(&format!("SELECT * FROM {} LIMIT {}", table, sample_size))
            .await?;
        report.sample = Some(sample);

        let has_column = |wanted: &str| {
            report
                .columns
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(wanted))
        };
        let (has_department, has_salary) = (has_column("department"), has_column("salary"));

        if has_department {
            match self
                .introspector
                .sample_departments(MAX_LISTED_DEPARTMENTS)
                .await
            {
                Ok(departments) => report.departments = Some(departments),
                Err(e) => warn!("Could not list departments: {}", e),
            }
        }

        if has_salary {
            let stats = self
                .run(&format!(
                    "SELECT MIN(salary) as min_salary, MAX(salary) as max_salary, AVG(salary) as avg_salary FROM {} WHERE salary IS NOT NULL",
                    table
                ))
                .await;
            match stats {
                Ok(result) => report.salary_range = salary_range(&result),
                Err(e) => warn!("Could not compute salary range: {}", e),
            }
        }

        Ok(report)
    }

    async fn run(&self, sql: &str) -> Result<ExecutionResult> {
        let query = self
            .sanitizer
            .sanitize(&GeneratedQuery::inspection(sql))
            .map_err(|r| AppError::SanitizationRejected(r.to_string()))?;
        let result = self.executor.execute(&query).await;
        if result.success {
            Ok(result)
        } else {
            Err(AppError::ExecutionFailed(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

fn salary_range(result: &ExecutionResult) -> Option<SalaryRange> {
    let row = result.rows.first()?;
    let number = |key: &str| row.get(key).and_then(Value::as_f64);
    Some(SalaryRange {
        min: number("min_salary")?,
        max: number("max_salary")?,
        avg: number("avg_salary")?,
    })
}

/// `1234567.891` → `1,234,567.89`
fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl TableReport {
    /// Plain-text report for terminal output.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Inspecting table: {}", self.table);

        if !self.exists {
            let _ = writeln!(out, "Table \"{}\" does not exist", self.table);
            return out;
        }

        let _ = writeln!(out, "\nTable Structure:");
        let _ = writeln!(out, "{:<20} | {:<20} | Nullable", "Column Name", "Data Type");
        let _ = writeln!(out, "{}", "-".repeat(55));
        for column in &self.columns {
            let _ = writeln!(
                out,
                "{:<20} | {:<20} | {}",
                column.name,
                column.declared_type,
                if column.nullable { "YES" } else { "NO" }
            );
        }

        let _ = writeln!(out, "\nTotal Records: {}", self.row_count);
        let Some(sample) = &self.sample else {
            let _ = writeln!(out, "Table is empty - no sample data to show");
            return out;
        };

        let _ = writeln!(out, "\nSample Data (first {} records):", self.sample_size);
        let header = sample
            .columns
            .iter()
            .map(|name| format!("{:<15}", name))
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = writeln!(out, "{}", header);
        let _ = writeln!(out, "{}", "-".repeat(header.len()));
        for row in &sample.rows {
            let line = sample
                .columns
                .iter()
                .map(|name| format!("{:<15}", cell_text(row.get(name))))
                .collect::<Vec<_>>()
                .join(" | ");
            let _ = writeln!(out, "{}", line);
        }

        match &self.departments {
            Some(departments) if !departments.is_empty() => {
                let _ = writeln!(out, "\nDepartments found: {}", departments.join(", "));
            }
            Some(_) => {}
            None => {
                let _ = writeln!(out, "\nNo department column found or accessible");
            }
        }

        match &self.salary_range {
            Some(range) => {
                let _ = writeln!(
                    out,
                    "\nSalary Range: ${} - ${} (Avg: ${})",
                    format_money(range.min),
                    format_money(range.max),
                    format_money(range.avg)
                );
            }
            None => {
                let _ = writeln!(out, "\nNo salary column found or accessible");
            }
        }

        out
    }
}
