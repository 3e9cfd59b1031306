//! Derive a `COUNT(*)` statement from a paged `SELECT`.
//!
//! The derived statement keeps the first `FROM <table> [alias]` and the `WHERE` clause up to
//! the first `ORDER`, `LIMIT` or `OFFSET`, so filter logic lives once in the paged template.
//!
//! Queries using `GROUP BY`, window functions, or joins that multiply base rows are not
//! special-cased: only the first table after `FROM` is kept, and a `GROUP BY` inside the kept
//! `WHERE` text counts raw rows rather than groups.
//!
//! The derived statement is run with the leading parameters up to the highest marker it
//! still contains. Markers in the dropped tail must therefore be numbered after every
//! marker in the kept `WHERE` clause: with `WHERE a = $1 AND b = $3 ... LIMIT $2`, `$2` is
//! bound but no longer referenced, and Postgres rejects the statement because it cannot
//! infer that parameter's type.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::QueryManagerError;

static FROM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfrom\s+([\w.]+)(?:\s+(?:as\s+)?(\w+))?").expect("from pattern")
});

static WHERE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwhere\b").expect("where pattern"));

static WHERE_END_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:order|limit|offset)\b").expect("where end pattern"));

/// Words that may follow the table name without being an alias.
const NOT_AN_ALIAS: &[&str] = &[
    "where", "order", "limit", "offset", "group", "having", "join", "inner", "left", "right",
    "full", "cross", "natural", "outer", "on", "using", "union", "intersect", "except", "window",
    "fetch", "for", "returning", "as",
];

/// Build `SELECT COUNT(*) AS total FROM <table> [alias] [WHERE …]` from `sql`.
///
/// ```rust
/// use sql_query_manager::count::derive_count_sql;
///
/// let sql = "SELECT col FROM t WHERE x=$1 ORDER BY y LIMIT 10";
/// assert_eq!(
///     derive_count_sql(sql).unwrap(),
///     "SELECT COUNT(*) AS total FROM t WHERE x=$1"
/// );
/// ```
///
/// # Errors
/// Returns `QueryManagerError::MalformedQuery` when `sql` has no `FROM` clause.
pub fn derive_count_sql(sql: &str) -> Result<String, QueryManagerError> {
    let from = FROM_PATTERN.captures(sql).ok_or_else(|| {
        QueryManagerError::MalformedQuery("FROM clause not found in the original query".into())
    })?;
    let whole = from.get(0).map_or(0..0, |m| m.range());
    let table = from.get(1).map_or("", |m| m.as_str());
    let alias = from
        .get(2)
        .map(|m| m.as_str())
        .filter(|word| !NOT_AN_ALIAS.contains(&word.to_ascii_lowercase().as_str()));

    let mut count_sql = format!("SELECT COUNT(*) AS total FROM {table}");
    if let Some(alias) = alias {
        count_sql.push(' ');
        count_sql.push_str(alias);
    }

    // An alias candidate that was really a keyword belongs to the rest of the statement.
    let rest_start = match (alias, from.get(2)) {
        (None, Some(keyword)) => keyword.start(),
        _ => whole.end,
    };
    if let Some(clause) = where_clause(&sql[rest_start..]) {
        count_sql.push(' ');
        count_sql.push_str(clause);
    }

    Ok(strip_terminator(&count_sql).to_string())
}

fn where_clause(rest: &str) -> Option<&str> {
    let start = WHERE_PATTERN.find(rest)?.start();
    let tail = &rest[start..];
    let end = WHERE_END_PATTERN
        .find(tail)
        .map_or(tail.len(), |m| m.start());
    let clause = strip_terminator(&tail[..end]);
    (!clause.is_empty()).then_some(clause)
}

fn strip_terminator(sql: &str) -> &str {
    sql.trim_end().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_order_and_limit() {
        let sql = "SELECT col FROM t WHERE x=$1 ORDER BY y LIMIT 10";
        assert_eq!(
            derive_count_sql(sql).unwrap(),
            "SELECT COUNT(*) AS total FROM t WHERE x=$1"
        );
    }

    #[test]
    fn keeps_alias_and_schema_qualified_table() {
        let sql = "select t.id, t.amount\n  from finance.transactions t\n where t.user_id = $1\n   and t.amount > $2\n order by t.date desc\n limit 10 offset 20;";
        assert_eq!(
            derive_count_sql(sql).unwrap(),
            "SELECT COUNT(*) AS total FROM finance.transactions t where t.user_id = $1\n   and t.amount > $2"
        );
    }

    #[test]
    fn accepts_as_before_alias() {
        let sql = "SELECT u.id FROM users AS u WHERE u.active LIMIT 5";
        assert_eq!(
            derive_count_sql(sql).unwrap(),
            "SELECT COUNT(*) AS total FROM users u WHERE u.active"
        );
    }

    #[test]
    fn without_where_counts_whole_table() {
        assert_eq!(
            derive_count_sql("SELECT * FROM users ORDER BY id;").unwrap(),
            "SELECT COUNT(*) AS total FROM users"
        );
        assert_eq!(
            derive_count_sql("SELECT * FROM users;").unwrap(),
            "SELECT COUNT(*) AS total FROM users"
        );
    }

    #[test]
    fn strips_trailing_terminators() {
        assert_eq!(
            derive_count_sql("SELECT * FROM users WHERE id = $1 ;; ").unwrap(),
            "SELECT COUNT(*) AS total FROM users WHERE id = $1"
        );
    }

    #[test]
    fn order_like_identifiers_do_not_end_the_where_clause() {
        let sql = "SELECT * FROM orders o WHERE o.order_id = $1 AND o.limit_value > 0 ORDER BY o.id";
        assert_eq!(
            derive_count_sql(sql).unwrap(),
            "SELECT COUNT(*) AS total FROM orders o WHERE o.order_id = $1 AND o.limit_value > 0"
        );
    }

    #[test]
    fn missing_from_is_malformed() {
        assert!(matches!(
            derive_count_sql("SELECT 1"),
            Err(QueryManagerError::MalformedQuery(_))
        ));
    }

    #[test]
    fn tail_markers_numbered_below_the_where_clause_stay_in_the_bound_prefix() {
        let sql = "SELECT * FROM t WHERE a = $1 AND b = $3 ORDER BY a LIMIT $2";
        let count_sql = derive_count_sql(sql).unwrap();
        assert_eq!(count_sql, "SELECT COUNT(*) AS total FROM t WHERE a = $1 AND b = $3");
        assert_eq!(crate::translation::max_placeholder(&count_sql), 3);
    }

    #[test]
    fn interpolated_limits_are_dropped() {
        let sql = "SELECT * FROM t WHERE a = $1 {{conditions}} ORDER BY {{column}} {{order}} LIMIT {{limit}} OFFSET {{page}}";
        assert_eq!(
            derive_count_sql(sql).unwrap(),
            "SELECT COUNT(*) AS total FROM t WHERE a = $1 {{conditions}}"
        );
    }
}
