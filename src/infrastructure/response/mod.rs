use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static SQL_FENCE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```sql\n?").unwrap());

static BARE_FENCE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\n?").unwrap());

/// Removes reasoning blocks some models emit ahead of the answer.
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned.trim().to_string()
}

/// Drops markdown code fences (```` ```sql ```` and bare ```` ``` ````) and trims.
pub fn strip_code_fences(text: &str) -> String {
    let without_sql = SQL_FENCE_PATTERN.replace_all(text, "");
    BARE_FENCE_PATTERN
        .replace_all(&without_sql, "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_think_tags() {
        let input = "<think>Need the IT rows</think>SELECT * FROM employees;";
        assert_eq!(clean_llm_response(input), "SELECT * FROM employees;");
    }

    #[test]
    fn test_clean_self_closing_think() {
        assert_eq!(clean_llm_response("<think />SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_clean_reasoning_tags() {
        let input = "<reasoning>count rows</reasoning>\nSELECT COUNT(*) FROM employees;";
        assert_eq!(clean_llm_response(input), "SELECT COUNT(*) FROM employees;");
    }

    #[test]
    fn test_strip_sql_fence() {
        let input = "```sql\nSELECT name FROM employees;\n```";
        assert_eq!(strip_code_fences(input), "SELECT name FROM employees;");
    }

    #[test]
    fn test_strip_uppercase_and_bare_fences() {
        assert_eq!(strip_code_fences("```SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nSELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_strip_preserves_plain_sql() {
        let input = "  SELECT name FROM employees WHERE salary > 50000;  ";
        assert_eq!(
            strip_code_fences(input),
            "SELECT name FROM employees WHERE salary > 50000;"
        );
    }
}
