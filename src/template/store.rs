use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, warn};

use super::identifier::TemplateId;
use crate::error::QueryManagerError;

/// Line prefix that opens a new template; the rest of the line names it.
pub const TEMPLATE_MARKER: &str = "--";

/// Immutable two-level mapping `namespace -> id -> template text`.
///
/// Built once from SQL sources and shared (usually behind an `Arc`) by everything that
/// needs lookups. A source may define several templates:
///
/// ```rust
/// use sql_query_manager::prelude::*;
///
/// let store = TemplateStore::from_sources([(
///     "users",
///     "-- find-by-id\nSELECT id, name FROM users WHERE id = $1;\n\n-- delete\nDELETE FROM users WHERE id = $1",
/// )]);
/// assert_eq!(
///     store.lookup("users", "find-by-id").unwrap(),
///     "SELECT id, name FROM users WHERE id = $1;"
/// );
/// assert_eq!(store.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateStore {
    namespaces: HashMap<String, HashMap<String, String>>,
}

impl TemplateStore {
    /// Build a store from `(namespace, source text)` pairs.
    pub fn from_sources<I, N, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut store = TemplateStore::default();
        for (namespace, text) in sources {
            store.add_source(namespace.as_ref(), text.as_ref());
        }
        store
    }

    /// Load every `*.sql` file in `dir`; each file's stem is its namespace.
    ///
    /// Files are read in name order so repeated loads of the same directory are identical.
    ///
    /// # Errors
    /// Returns `QueryManagerError::TemplateSource` if the directory or a file cannot be read.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, QueryManagerError> {
        let dir = dir.as_ref();
        let source_err = |source| QueryManagerError::TemplateSource {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = BTreeMap::new();
        for entry in std::fs::read_dir(dir).map_err(source_err)? {
            let path = entry.map_err(source_err)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                files.insert(stem.to_string(), path.clone());
            }
        }

        let mut store = TemplateStore::default();
        for (namespace, path) in files {
            let text =
                std::fs::read_to_string(&path).map_err(|source| QueryManagerError::TemplateSource {
                    path: path.clone(),
                    source,
                })?;
            store.add_source(&namespace, &text);
        }
        debug!(dir = %dir.display(), templates = store.len(), "loaded query templates");
        Ok(store)
    }

    fn add_source(&mut self, namespace: &str, text: &str) {
        let mut current: Option<&str> = None;
        let mut buffer: Vec<&str> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix(TEMPLATE_MARKER) {
                if let Some(id) = current.take() {
                    self.insert(namespace, id, &buffer);
                }
                buffer.clear();
                current = Some(name.trim());
            } else if current.is_some() {
                buffer.push(line);
            }
        }

        if let Some(id) = current {
            self.insert(namespace, id, &buffer);
        }
    }

    fn insert(&mut self, namespace: &str, id: &str, lines: &[&str]) {
        let body = lines.join("\n").trim().to_string();
        if body.is_empty() {
            warn!(namespace, id, "skipping query template with an empty body");
            return;
        }
        let templates = self.namespaces.entry(namespace.to_string()).or_default();
        if templates.insert(id.to_string(), body).is_some() {
            warn!(namespace, id, "query template defined twice; keeping the last one");
        }
    }

    /// Template text for `namespace.id`.
    ///
    /// # Errors
    /// Returns `QueryManagerError::TemplateNotFound` for an unknown namespace or id.
    pub fn lookup(&self, namespace: &str, id: &str) -> Result<&str, QueryManagerError> {
        self.namespaces
            .get(namespace)
            .and_then(|templates| templates.get(id))
            .map(String::as_str)
            .ok_or_else(|| QueryManagerError::TemplateNotFound(format!("{namespace}.{id}")))
    }

    /// Template text for a parsed identifier.
    ///
    /// # Errors
    /// Returns `QueryManagerError::TemplateNotFound` when nothing is registered under `id`.
    pub fn get(&self, id: &TemplateId) -> Result<&str, QueryManagerError> {
        self.lookup(id.namespace(), id.id())
    }

    /// Namespaces in sorted order.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Template ids of one namespace in sorted order.
    #[must_use]
    pub fn ids(&self, namespace: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .namespaces
            .get(namespace)
            .map(|templates| templates.keys().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Total number of templates across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
