//! Trusted template parameters.
//!
//! `{{name}}` markers are replaced by literal text before a statement runs. This is the one
//! place SQL text is built from values, so it only accepts developer-controlled input such as
//! column names or `ASC`/`DESC`. Request data goes through `bind`.

/// Opening delimiter of an interpolation marker.
pub const MARKER_OPEN: &str = "{{";
/// Closing delimiter of an interpolation marker.
pub const MARKER_CLOSE: &str = "}}";

/// Keep only `[A-Za-z0-9_]` from a marker name.
#[must_use]
pub fn sanitize_marker_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Replace every `{{name}}` in `sql` with `value`.
///
/// The name is sanitized first; a name that sanitizes to nothing matches nothing. Returns
/// `None` when no marker was found so callers can leave their text untouched.
#[must_use]
pub fn interpolate_marker(sql: &str, name: &str, value: &str) -> Option<String> {
    let name = sanitize_marker_name(name);
    if name.is_empty() {
        return None;
    }
    let marker = format!("{MARKER_OPEN}{name}{MARKER_CLOSE}");
    sql.contains(&marker).then(|| sql.replace(&marker, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_all_occurrences() {
        let sql = "SELECT {{col}} FROM t ORDER BY {{col}} {{order}}";
        assert_eq!(
            interpolate_marker(sql, "col", "created_at").as_deref(),
            Some("SELECT created_at FROM t ORDER BY created_at {{order}}")
        );
    }

    #[test]
    fn hostile_names_cannot_target_other_markers() {
        let sql = "SELECT * FROM x ORDER BY {{column}}";
        assert_eq!(sanitize_marker_name("col; DROP TABLE x"), "colDROPTABLEx");
        assert_eq!(interpolate_marker(sql, "col; DROP TABLE x", "foo"), None);
        assert_eq!(
            interpolate_marker(sql, "{{column}}", "foo"),
            Some("SELECT * FROM x ORDER BY foo".to_string())
        );
    }

    #[test]
    fn empty_names_match_nothing() {
        assert_eq!(interpolate_marker("SELECT {{}}", "", "x"), None);
        assert_eq!(interpolate_marker("SELECT {{}}", "!!", "x"), None);
    }

    #[test]
    fn no_fuzzy_matches() {
        assert_eq!(interpolate_marker("SELECT {{ col }}", "col", "x"), None);
        assert_eq!(interpolate_marker("SELECT {{column}}", "col", "x"), None);
    }
}
