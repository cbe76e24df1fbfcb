//! Schema knowledge about the employee table
//!
//! Built once per introspection from live catalog metadata and never mutated. The
//! rendered text feeds the remote model prompt, so its format does not depend on the
//! database engine.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Database engine behind the connection, which decides the catalog dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbType {
    /// `information_schema.columns`
    Postgres,
    /// `DESCRIBE <table>`
    MySql,
    /// `PRAGMA table_info(<table>)`
    Sqlite,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgresql",
            DbType::MySql => "mysql",
            DbType::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
}

/// Optional employee columns a deployment actually has.
///
/// Resolved once from the introspected column list; variant columns record which
/// spelling was found (`date_of_join` vs `hire_date`, `position` vs `job_title`).
/// `join_dates` holds the one resolved join-date column, or both common spellings
/// when the layout is assumed rather than read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPresence {
    pub name: Option<String>,
    pub department: bool,
    pub salary: bool,
    pub email: bool,
    pub join_dates: Vec<String>,
    pub position: Option<String>,
}

const NAME_CANDIDATES: &[&str] = &["name", "full_name", "employee_name", "first_name"];
const JOIN_DATE_CANDIDATES: &[&str] = &["date_of_join", "hire_date", "start_date", "employment_date"];
const POSITION_CANDIDATES: &[&str] = &["position", "job_title", "title", "role"];

impl ColumnPresence {
    pub fn resolve(columns: &[ColumnDescriptor]) -> Self {
        let has = |wanted: &str| columns.iter().any(|c| c.name.eq_ignore_ascii_case(wanted));
        let first_of = |candidates: &[&str]| {
            candidates
                .iter()
                .find(|candidate| has(candidate))
                .map(|candidate| candidate.to_string())
        };

        Self {
            name: first_of(NAME_CANDIDATES),
            department: has("department"),
            salary: has("salary"),
            email: has("email"),
            join_dates: first_of(JOIN_DATE_CANDIDATES).into_iter().collect(),
            position: first_of(POSITION_CANDIDATES),
        }
    }

    /// Layout assumed when the live catalog could not be read.
    pub fn assumed() -> Self {
        Self {
            name: Some("name".to_string()),
            department: true,
            salary: true,
            email: true,
            join_dates: vec!["date_of_join".to_string(), "hire_date".to_string()],
            position: Some("position".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaSource {
    Live(DbType),
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub row_count: Option<i64>,
    pub sample_departments: Vec<String>,
    pub presence: ColumnPresence,
    pub source: SchemaSource,
    /// Text used verbatim when `source` is `Default`.
    fallback_text: Option<String>,
}

impl SchemaDescription {
    pub fn live(
        table: &str,
        db_type: DbType,
        columns: Vec<ColumnDescriptor>,
        row_count: Option<i64>,
        sample_departments: Vec<String>,
    ) -> Self {
        let presence = ColumnPresence::resolve(&columns);
        Self {
            table: table.to_string(),
            columns,
            row_count,
            sample_departments,
            presence,
            source: SchemaSource::Live(db_type),
            fallback_text: None,
        }
    }

    pub fn degraded(table: &str, fallback_text: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            row_count: None,
            sample_departments: Vec::new(),
            presence: ColumnPresence::assumed(),
            source: SchemaSource::Default,
            fallback_text: Some(fallback_text.replace("{table}", table)),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.source, SchemaSource::Live(_))
    }

    pub fn render(&self) -> String {
        if let Some(text) = &self.fallback_text {
            return text.clone();
        }

        let mut out = String::new();
        let _ = writeln!(out, "Database Schema for '{}' table:", self.table);
        for column in &self.columns {
            let nullable = if column.nullable { "NULL" } else { "NOT NULL" };
            let _ = writeln!(
                out,
                "- {} ({}): {}",
                column.name,
                column.declared_type.to_uppercase(),
                nullable
            );
        }

        if let Some(count) = self.row_count {
            let _ = writeln!(out, "\nTable contains {} employee records.", count);
        }
        if !self.sample_departments.is_empty() {
            let _ = writeln!(
                out,
                "Sample departments: {}",
                self.sample_departments.join(", ")
            );
        }
        out
    }
}

/// Used when introspection fails. `{table}` is replaced with the configured table.
pub const DEFAULT_SCHEMA_TEXT: &str = "Database Schema for '{table}' table (common fields):
- id: Primary key
- name / first_name / last_name: Employee names
- department: Department name
- salary: Employee salary
- date_of_join / hire_date: Date employee joined
- email: Employee email
- position / job_title: Job position
- phone: Phone number
- address: Address information
- manager_id: Manager reference
- status: Employment status

Note: Field names may vary. Use appropriate field names based on the actual table structure.
";
