//! SQL Sanitizer
//!
//! Every candidate statement passes through here before it may touch the database:
//! - Code fence and whitespace stripping
//! - SELECT-only prefix check
//! - Statement keyword denylist (whole words, so `created_at` is fine)
//! - Single statement only: no `;` except one trailing terminator
//! - Target table must be referenced
//! - Trailing semicolon normalization
//!
//! A passing candidate becomes a [`SanitizedQuery`], the only type the executor accepts.

use crate::domain::query::{GeneratedQuery, Provenance};
use crate::infrastructure::response::strip_code_fences;
use serde::Serialize;
use std::fmt;

pub const DENIED_KEYWORDS: &[&str] = &[
    "drop", "delete", "update", "insert", "alter", "create", "truncate", "grant", "revoke",
];

/// Why a candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Rejection {
    Empty,
    NotSelect,
    ForbiddenKeyword(String),
    MultipleStatements,
    TableNotReferenced(String),
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::Empty => "EMPTY_QUERY",
            Rejection::NotSelect => "NOT_SELECT",
            Rejection::ForbiddenKeyword(_) => "FORBIDDEN_KEYWORD",
            Rejection::MultipleStatements => "MULTIPLE_STATEMENTS",
            Rejection::TableNotReferenced(_) => "TABLE_NOT_REFERENCED",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "Query is empty"),
            Rejection::NotSelect => write!(f, "Only SELECT statements are allowed"),
            Rejection::ForbiddenKeyword(keyword) => {
                write!(f, "SQL contains forbidden keyword: {}", keyword.to_uppercase())
            }
            Rejection::MultipleStatements => write!(f, "Only a single statement is allowed"),
            Rejection::TableNotReferenced(table) => {
                write!(f, "Query must reference the '{}' table", table)
            }
        }
    }
}

/// A statement that passed every gate. Constructed only by [`SqlSanitizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery {
    sql: String,
    provenance: Provenance,
}

impl SanitizedQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}

#[derive(Debug, Clone)]
pub struct SqlSanitizer {
    table: String,
}

impl SqlSanitizer {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
        }
    }

    pub fn sanitize(&self, query: &GeneratedQuery) -> Result<SanitizedQuery, Rejection> {
        let sql = self.clean(query.sql())?;
        Ok(SanitizedQuery {
            sql,
            provenance: query.provenance().clone(),
        })
    }

    /// Runs the gates on raw text and returns the normalized statement.
    pub fn clean(&self, raw: &str) -> Result<String, Rejection> {
        let mut sql = strip_code_fences(raw);
        if sql.is_empty() {
            return Err(Rejection::Empty);
        }

        let lower = sql.to_lowercase();
        if !lower.starts_with("select") {
            return Err(Rejection::NotSelect);
        }

        if let Some(keyword) = DENIED_KEYWORDS
            .iter()
            .find(|keyword| contains_whole_word(&lower, keyword))
        {
            return Err(Rejection::ForbiddenKeyword(keyword.to_string()));
        }

        // SQLite runs every statement in a batch, so anything after a `;` would execute.
        let body_len = {
            let body = sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
            if body.contains(';') {
                return Err(Rejection::MultipleStatements);
            }
            body.len()
        };
        sql.truncate(body_len);

        if !lower.contains(&self.table.to_lowercase()) {
            return Err(Rejection::TableNotReferenced(self.table.clone()));
        }

        sql.push(';');
        Ok(sql)
    }
}

/// Word characters are ASCII alphanumerics and `_`, matching SQL identifiers.
fn contains_whole_word(text: &str, keyword: &str) -> bool {
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let bytes = text.as_bytes();
    text.match_indices(keyword).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = start == 0 || !is_word(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_word(bytes[end]);
        before_ok && after_ok
    })
}
