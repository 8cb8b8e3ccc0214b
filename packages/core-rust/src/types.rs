use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned identifier shared by every entity type.
///
/// Ids are opaque strings (UUIDs on the reference backend); the controllers
/// only compare them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Borrows the raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scalar value used for filters and for comparable entity fields.
///
/// Variant order defines the cross-type ordering used when sorting mixed
/// columns: text < integer < boolean.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    /// UTF-8 text.
    Text(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// Boolean flag.
    Bool(bool),
}

impl Scalar {
    /// Returns `true` for values that count as "not set" in a filter bar.
    ///
    /// Only the empty string qualifies; `0` and `false` are real filter values.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.is_empty())
    }

    /// Renders the value the way it travels in a query string.
    #[must_use]
    pub fn to_param(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// One page of a remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult<T> {
    /// Rows of the requested page, in server order.
    pub rows: Vec<T>,
    /// Total number of rows matching the filters across all pages.
    pub total: u64,
}

impl<T> ListResult<T> {
    /// Creates a page from rows and the overall total.
    #[must_use]
    pub fn new(rows: Vec<T>, total: u64) -> Self {
        Self { rows, total }
    }

    /// An empty result with a zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
        }
    }
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}
