//! Rule-based fallback generator
//!
//! Keyword intents mapped to fixed SQL templates. Templates are checked in a fixed
//! priority order and the first match wins; the final template always matches, so every
//! input produces a SELECT. Column spellings come from the resolved [`ColumnPresence`],
//! and a template that needs a column the table lacks is skipped.

use crate::domain::query::GeneratedQuery;
use crate::domain::schema::{ColumnPresence, DbType};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

const KNOWN_DEPARTMENTS: &[&str] = &[
    "IT",
    "HR",
    "Sales",
    "Marketing",
    "Finance",
    "Engineering",
    "Operations",
];

const SALARY_WORDS: &[&str] = &["salary", "pay", "wage", "earning", "income"];
const DEPARTMENT_WORDS: &[&str] = &["department", "dept"];
const POSITION_WORDS: &[&str] = &["position", "job", "title", "role"];
const DATE_WORDS: &[&str] = &["joined", "hired", "date", "when"];
const DETAIL_WORDS: &[&str] = &["details", "information", "everything", "all details"];
const COUNT_WORDS: &[&str] = &["count", "how many", "number of"];
const LIST_PHRASES: &[&str] = &["all employees", "show employees", "list employees"];
const COMPARISON_WORDS: &[&str] = &["greater", "more than", "above", "over"];
const HIRING_WORDS: &[&str] = &["joined", "hired", "recent", "new"];
const NAME_SEARCH_WORDS: &[&str] = &["contains", "like", "starts", "ends"];

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}

/// Unresolved name columns fall back to the conventional `name`.
fn name_column(presence: &ColumnPresence) -> &str {
    presence.name.as_deref().unwrap_or("name")
}

/// Keyword intents found in a lowercased question.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Intents {
    salary: bool,
    department: bool,
    position: bool,
    date: bool,
    details: bool,
    count: bool,
}

impl Intents {
    fn classify(text: &str) -> Self {
        Self {
            salary: mentions_any(text, SALARY_WORDS),
            department: mentions_any(text, DEPARTMENT_WORDS),
            position: mentions_any(text, POSITION_WORDS),
            date: mentions_any(text, DATE_WORDS),
            details: mentions_any(text, DETAIL_WORDS),
            count: mentions_any(text, COUNT_WORDS),
        }
    }

    fn projection(&self, presence: &ColumnPresence) -> String {
        if self.details {
            return "*".to_string();
        }
        if self.count {
            return "COUNT(*) as count".to_string();
        }

        let mut columns = vec![name_column(presence)];
        if self.department && presence.department {
            columns.push("department");
        }
        if self.salary && presence.salary {
            columns.push("salary");
        }
        if self.position {
            if let Some(position) = &presence.position {
                columns.push(position);
            }
        }
        if self.date {
            if let Some(joined) = presence.join_dates.first() {
                columns.push(joined);
            }
        }
        columns.join(", ")
    }
}

pub struct FallbackQueryGenerator {
    table: String,
    db_type: DbType,
}

impl FallbackQueryGenerator {
    pub fn new(table: &str, db_type: DbType) -> Self {
        Self {
            table: table.to_string(),
            db_type,
        }
    }

    pub fn generate(&self, question: &str, presence: &ColumnPresence) -> GeneratedQuery {
        GeneratedQuery::fallback(self.build_sql(question, presence))
    }

    fn build_sql(&self, question: &str, presence: &ColumnPresence) -> String {
        let text = question.to_lowercase();
        let intents = Intents::classify(&text);
        let projection = intents.projection(presence);
        let table = &self.table;
        let name = name_column(presence);
        let mentions_department = presence.department && text.contains("department");
        let known_department = KNOWN_DEPARTMENTS
            .iter()
            .map(|dept| dept.to_lowercase())
            .find(|dept| presence.department && text.contains(dept.as_str()));

        if intents.count {
            if !mentions_department {
                return format!("SELECT COUNT(*) as total_employees FROM {};", table);
            }
            return match known_department {
                Some(dept) => format!(
                    "SELECT COUNT(*) as count FROM {} WHERE LOWER(department) LIKE '%{}%';",
                    table, dept
                ),
                None => format!(
                    "SELECT department, COUNT(*) as count FROM {} WHERE department IS NOT NULL GROUP BY department ORDER BY count DESC;",
                    table
                ),
            };
        }

        if mentions_any(&text, LIST_PHRASES) && !intents.details {
            return format!(
                "SELECT {} FROM {} ORDER BY {} LIMIT 100;",
                projection, table, name
            );
        }

        if mentions_department {
            if let Some(dept) = &known_department {
                return format!(
                    "SELECT {} FROM {} WHERE LOWER(department) LIKE '%{}%' ORDER BY {} LIMIT 50;",
                    projection, table, dept, name
                );
            }
        }

        if intents.salary && presence.salary && mentions_any(&text, COMPARISON_WORDS) {
            if let Some(amount) = NUMBER_PATTERN.find(&text) {
                return format!(
                    "SELECT {} FROM {} WHERE salary > {} ORDER BY salary DESC LIMIT 50;",
                    projection,
                    table,
                    amount.as_str()
                );
            }
        }

        let join_dates = &presence.join_dates;
        if mentions_any(&text, HIRING_WORDS) && !join_dates.is_empty() {
            let window = if text.contains("last year") || text.contains("2023") {
                Some(self.joined_within_last_year(join_dates))
            } else if text.contains("this year") || text.contains("2024") {
                Some(self.joined_this_year(join_dates))
            } else {
                None
            };
            if let Some(condition) = window {
                let projection = if intents.date {
                    projection.clone()
                } else {
                    let mut columns = vec![name];
                    if presence.department {
                        columns.push("department");
                    }
                    columns.push(&join_dates[0]);
                    columns.join(", ")
                };
                return format!(
                    "SELECT {} FROM {} WHERE {} ORDER BY {} DESC LIMIT 50;",
                    projection,
                    table,
                    condition,
                    latest_join_date(join_dates)
                );
            }
        }

        if text.contains("name") && mentions_any(&text, NAME_SEARCH_WORDS) {
            return format!(
                "SELECT {name} FROM {} WHERE {name} IS NOT NULL ORDER BY {name} LIMIT 100;",
                table,
                name = name
            );
        }

        if text.contains("email") && presence.email {
            let columns = if presence.department {
                format!("{}, email, department", name)
            } else {
                format!("{}, email", name)
            };
            return format!(
                "SELECT {} FROM {} WHERE email IS NOT NULL ORDER BY {} LIMIT 100;",
                columns, table, name
            );
        }

        if intents.position {
            if let Some(position) = &presence.position {
                let columns = if presence.department {
                    format!("{}, {}, department", name, position)
                } else {
                    format!("{}, {}", name, position)
                };
                return format!(
                    "SELECT {} FROM {} WHERE {} IS NOT NULL ORDER BY {} LIMIT 100;",
                    columns, table, position, name
                );
            }
        }

        format!("SELECT {name} FROM {} ORDER BY {name} LIMIT 20;", table, name = name)
    }

    fn joined_within_last_year(&self, columns: &[String]) -> String {
        let since = match self.db_type {
            DbType::Postgres => "CURRENT_DATE - INTERVAL '1 year'",
            DbType::MySql => "DATE_SUB(CURDATE(), INTERVAL 1 YEAR)",
            DbType::Sqlite => "date('now', '-1 year')",
        };
        let tests: Vec<String> = columns
            .iter()
            .map(|column| format!("{} >= {}", column, since))
            .collect();
        format!("({})", tests.join(" OR "))
    }

    fn joined_this_year(&self, columns: &[String]) -> String {
        let current_year = match self.db_type {
            DbType::Postgres => "EXTRACT(YEAR FROM CURRENT_DATE)",
            DbType::MySql => "YEAR(CURDATE())",
            DbType::Sqlite => "strftime('%Y', 'now')",
        };
        let tests: Vec<String> = columns
            .iter()
            .map(|column| {
                let year = match self.db_type {
                    DbType::Postgres => format!("EXTRACT(YEAR FROM {})", column),
                    DbType::MySql => format!("YEAR({})", column),
                    DbType::Sqlite => format!("strftime('%Y', {})", column),
                };
                format!("{} = {}", year, current_year)
            })
            .collect();
        format!("({})", tests.join(" OR "))
    }
}

/// SQLite's `COALESCE` needs two arguments, so a single column is used bare.
fn latest_join_date(columns: &[String]) -> String {
    match columns {
        [only] => only.clone(),
        _ => format!("COALESCE({})", columns.join(", ")),
    }
}
