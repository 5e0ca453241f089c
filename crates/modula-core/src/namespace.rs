//! Namespace paths
//!
//! A namespace path locates a module in the state tree. Segments are joined
//! with `/` when the path is used as a key, and a namespaced module's entries
//! are addressed with the `path + "/"` prefix through the root store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between namespace segments
pub const SEPARATOR: char = '/';

/// Module location in the state tree
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespacePath(Vec<String>);

impl NamespacePath {
    /// The root path (no segments)
    pub fn root() -> Self {
        NamespacePath(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NamespacePath(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a `/`-joined path. Empty segments are skipped, so `""` and `"/"`
    /// both parse to the root.
    pub fn parse(path: &str) -> Self {
        NamespacePath(
            path.split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last segment (the module's own key in its parent)
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Path of the parent module, `None` for the root
    pub fn parent(&self) -> Option<NamespacePath> {
        if self.is_root() {
            return None;
        }
        Some(NamespacePath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Append one segment
    pub fn child(&self, segment: impl Into<String>) -> NamespacePath {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        NamespacePath(segments)
    }

    /// Append all segments of another path
    pub fn concat(&self, other: &NamespacePath) -> NamespacePath {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        NamespacePath(segments)
    }

    /// Check if `prefix` is an ancestor of (or equal to) this path
    pub fn starts_with(&self, prefix: &NamespacePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// `/`-joined key, `""` for the root
    pub fn key(&self) -> String {
        self.0.join("/")
    }

    /// Key prefix used for entries of a namespaced module at this path,
    /// `""` for the root
    pub fn prefix(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{}/", self.key())
        }
    }
}

impl fmt::Debug for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", self.key())
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.key())
        }
    }
}

impl From<&str> for NamespacePath {
    fn from(path: &str) -> Self {
        NamespacePath::parse(path)
    }
}

impl From<String> for NamespacePath {
    fn from(path: String) -> Self {
        NamespacePath::parse(&path)
    }
}

impl From<Vec<String>> for NamespacePath {
    fn from(segments: Vec<String>) -> Self {
        NamespacePath(segments)
    }
}

impl From<&[&str]> for NamespacePath {
    fn from(segments: &[&str]) -> Self {
        NamespacePath::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for NamespacePath {
    fn from(segments: [&str; N]) -> Self {
        NamespacePath::new(segments)
    }
}

/// Split a mutation/action/getter type into its namespace prefix (with the
/// trailing `/`) and local name.
///
/// `"a/b/setName"` splits into `("a/b/", "setName")`; a type without a
/// separator has an empty prefix.
pub fn split_type(entry_type: &str) -> (&str, &str) {
    match entry_type.rfind(SEPARATOR) {
        Some(idx) => entry_type.split_at(idx + 1),
        None => ("", entry_type),
    }
}
