//! Prompt Builder for text-to-SQL generation
//!
//! Wraps the rendered schema with the generation rules and a handful of literal
//! question/SQL pairs. Deterministic for a given schema.

use crate::domain::schema::{SchemaDescription, SchemaSource};

/// Build the system prompt handed to the remote model.
pub fn build_system_prompt(schema: &SchemaDescription) -> String {
    let table = &schema.table;
    let engine = match &schema.source {
        SchemaSource::Live(db_type) => format!("\nDatabase engine: {}\n", db_type.as_str()),
        SchemaSource::Default => String::new(),
    };

    format!(
        r#"You are a SQL query generator. Convert natural language questions into SQL SELECT queries for the existing '{table}' table.

{schema}{engine}
IMPORTANT RULES:
1. ONLY generate SELECT statements
2. Use ONLY the '{table}' table
3. Return valid SQL syntax for the database type in use
4. Use appropriate WHERE clauses for filtering
5. Handle case-insensitive searches with ILIKE (PostgreSQL) or LIKE with LOWER()
6. Use proper date functions for date comparisons
7. Always include appropriate column names in SELECT
8. Use ORDER BY for better results presentation
9. Limit results to reasonable numbers (LIMIT 100 or similar)
10. Handle NULL values appropriately with IS NULL / IS NOT NULL

FIELD NAME VARIATIONS TO CONSIDER:
- Name fields: name, first_name, last_name, full_name, employee_name
- Date fields: date_of_join, hire_date, start_date, employment_date
- Position fields: position, job_title, title, role
- ID fields: id, employee_id, emp_id
- Status fields: status, is_active, active, employment_status

EXAMPLE QUERY PATTERNS:
- "Show all employees" → SELECT * FROM {table} LIMIT 100;
- "IT department employees" → SELECT * FROM {table} WHERE department ILIKE '%IT%';
- "Employees earning over 50000" → SELECT * FROM {table} WHERE salary > 50000 ORDER BY salary DESC;
- "Recent hires" → SELECT * FROM {table} WHERE date_of_join > CURRENT_DATE - INTERVAL '1 year';

Respond with ONLY the SQL query, no explanations or formatting."#,
        table = table,
        schema = schema.render().trim_end(),
        engine = engine,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{ColumnDescriptor, DbType, DEFAULT_SCHEMA_TEXT};

    #[test]
    fn test_prompt_embeds_live_schema_and_engine() {
        let schema = SchemaDescription::live(
            "employees",
            DbType::Sqlite,
            vec![ColumnDescriptor {
                name: "salary".to_string(),
                declared_type: "real".to_string(),
                nullable: true,
            }],
            Some(4),
            Vec::new(),
        );
        let prompt = build_system_prompt(&schema);
        assert!(prompt.contains("- salary (REAL): NULL"));
        assert!(prompt.contains("Database engine: sqlite"));
        assert!(prompt.contains("1. ONLY generate SELECT statements"));
        assert!(prompt.ends_with("Respond with ONLY the SQL query, no explanations or formatting."));
    }

    #[test]
    fn test_prompt_uses_configured_table() {
        let schema = SchemaDescription::degraded("staff", DEFAULT_SCHEMA_TEXT);
        let prompt = build_system_prompt(&schema);
        assert!(prompt.contains("for the existing 'staff' table"));
        assert!(prompt.contains("SELECT * FROM staff LIMIT 100;"));
        assert!(!prompt.contains("Database engine"));
        assert_eq!(prompt.matches(" → SELECT").count(), 4);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let schema = SchemaDescription::degraded("employees", DEFAULT_SCHEMA_TEXT);
        assert_eq!(build_system_prompt(&schema), build_system_prompt(&schema));
    }
}
