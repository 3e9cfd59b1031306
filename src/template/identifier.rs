use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::QueryManagerError;

static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9._-]*\.[A-Za-z0-9._-]+$").expect("identifier pattern")
});

/// A validated `namespace.id` reference to a template.
///
/// The namespace is the text before the first `.`; everything after it is the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateId {
    namespace: String,
    id: String,
}

impl TemplateId {
    /// Validate and split an identifier.
    ///
    /// # Errors
    /// Returns `QueryManagerError::InvalidIdentifier` when `raw` does not match
    /// `^[A-Za-z][A-Za-z0-9._-]*\.[A-Za-z0-9._-]+$`.
    pub fn parse(raw: &str) -> Result<Self, QueryManagerError> {
        if !IDENTIFIER_PATTERN.is_match(raw) {
            return Err(QueryManagerError::InvalidIdentifier(raw.to_string()));
        }
        let (namespace, id) = raw
            .split_once('.')
            .ok_or_else(|| QueryManagerError::InvalidIdentifier(raw.to_string()))?;
        Ok(Self {
            namespace: namespace.to_string(),
            id: id.to_string(),
        })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.id)
    }
}

impl std::str::FromStr for TemplateId {
    type Err = QueryManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One identifier or an ordered chain of identifiers.
///
/// ```rust
/// use sql_query_manager::prelude::*;
///
/// let single = QueryIds::from("users.find-by-id");
/// let chain = QueryIds::from(["transactions.create", "transactions.add-to-category"]);
/// assert_eq!(single.len(), 1);
/// assert_eq!(chain.len(), 2);
///
/// let owned = QueryIds::from(format!("users.{}", "find-by-id"));
/// assert_eq!(owned, single);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIds<'a>(Vec<Cow<'a, str>>);

impl<'a> QueryIds<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every identifier before any of them is looked up.
    ///
    /// # Errors
    /// Returns `QueryManagerError::InvalidIdentifier` for the first malformed entry, or
    /// when the chain is empty.
    pub fn parse_all(&self) -> Result<Vec<TemplateId>, QueryManagerError> {
        if self.0.is_empty() {
            return Err(QueryManagerError::InvalidIdentifier(
                "empty query chain".to_string(),
            ));
        }
        self.0.iter().map(|raw| TemplateId::parse(raw)).collect()
    }

    /// The raw identifiers in chain order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl<'a> From<&'a str> for QueryIds<'a> {
    fn from(id: &'a str) -> Self {
        QueryIds(vec![Cow::Borrowed(id)])
    }
}

impl<'a> From<&'a String> for QueryIds<'a> {
    fn from(id: &'a String) -> Self {
        QueryIds(vec![Cow::Borrowed(id.as_str())])
    }
}

impl From<String> for QueryIds<'_> {
    fn from(id: String) -> Self {
        QueryIds(vec![Cow::Owned(id)])
    }
}

impl<'a> From<&'a [&'a str]> for QueryIds<'a> {
    fn from(ids: &'a [&'a str]) -> Self {
        QueryIds(ids.iter().copied().map(Cow::Borrowed).collect())
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for QueryIds<'a> {
    fn from(ids: [&'a str; N]) -> Self {
        QueryIds(ids.into_iter().map(Cow::Borrowed).collect())
    }
}

impl<'a> From<Vec<&'a str>> for QueryIds<'a> {
    fn from(ids: Vec<&'a str>) -> Self {
        QueryIds(ids.into_iter().map(Cow::Borrowed).collect())
    }
}

impl From<Vec<String>> for QueryIds<'_> {
    fn from(ids: Vec<String>) -> Self {
        QueryIds(ids.into_iter().map(Cow::Owned).collect())
    }
}
