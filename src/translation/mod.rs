//! Lexical handling of ordinal parameter markers.
//!
//! Templates are written with Postgres-style `$N` markers. The scanner skips quoted
//! strings, comments, and dollar-quoted bodies, so markers inside literals are never
//! rewritten or counted.

use std::borrow::Cow;

mod parsers;
mod scanner;

use scanner::find_markers;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    fn prefix(self) -> u8 {
        match self {
            PlaceholderStyle::Postgres => b'$',
            PlaceholderStyle::Sqlite => b'?',
        }
    }
}

/// Translate placeholders between Postgres-style `$N` and SQLite-style `?N`.
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let wanted = target.prefix();
    let mut out: Option<String> = None;
    let mut copied = 0;
    for marker in find_markers(sql) {
        if marker.prefix == wanted {
            continue;
        }
        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
        buf.push_str(&sql[copied..marker.start]);
        buf.push(char::from(wanted));
        buf.push_str(&sql[marker.start + 1..marker.end]);
        copied = marker.end;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// Highest ordinal marker referenced by `sql`, or 0 when it binds nothing.
///
/// This is the number of positional parameters the statement needs.
#[must_use]
pub fn max_placeholder(sql: &str) -> usize {
    find_markers(sql)
        .iter()
        .map(|marker| marker.ordinal)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_sqlite_to_postgres() {
        let sql = "select * from t where a = ?1 and b = ?2";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "select * from t where a = $1 and b = $2");
    }

    #[test]
    fn translates_postgres_to_sqlite() {
        let sql = "insert into t values($1, $2)";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "insert into t values(?1, ?2)");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?1', $1 -- $2\n/* ?3 */ from t where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "select '?1', ?1 -- $2\n/* ?3 */ from t where a = ?1");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select $1 from t $foo$ where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "$foo$ select $1 from t $foo$ where a = ?1");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "select 'ação' as label, $1 as v";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "select 'ação' as label, ?1 as v");
    }

    #[test]
    fn respects_disabled_flag() {
        let sql = "select * from t where a = ?1";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, false);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    #[test]
    fn max_placeholder_ignores_literals() {
        assert_eq!(max_placeholder("select 1"), 0);
        assert_eq!(max_placeholder("select * from t where a = $2 and b = $1"), 2);
        assert_eq!(max_placeholder("select '$9' from t where a = $1 -- $7"), 1);
        assert_eq!(max_placeholder("update t set a = ?3 where b = ?3"), 3);
    }

    #[test]
    fn multi_digit_ordinals() {
        assert_eq!(max_placeholder("values ($10, $2)"), 10);
    }
}
