//! Query Composer: UI query -> transport-ready parameters.
//!
//! Two conversions happen here and nowhere else:
//!
//! - the 0-based UI page index becomes the 1-based transport `page`;
//! - UI sort/filter names are renamed through the entity's
//!   [`QueryVocabulary`] and the sort direction becomes `ASC`/`DESC`.
//!
//! Composition is a pure function of its inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::Query;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Per-entity mapping of UI names onto the server's parameter names.
///
/// Names missing from the maps pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryVocabulary {
    /// Query-string parameter carrying the sort field.
    pub sort_param: &'static str,
    /// Query-string parameter carrying the sort direction.
    pub order_param: &'static str,
    /// `(ui_field, server_field)` pairs for sortable columns.
    pub sort_fields: &'static [(&'static str, &'static str)],
    /// `(ui_filter, server_param)` pairs for filter keys.
    pub filter_keys: &'static [(&'static str, &'static str)],
}

impl QueryVocabulary {
    /// Vocabulary that renames nothing and uses `sort`/`order`.
    pub const IDENTITY: Self = Self {
        sort_param: "sort",
        order_param: "order",
        sort_fields: &[],
        filter_keys: &[],
    };

    /// Server name of a sortable UI field.
    #[must_use]
    pub fn sort_field<'a>(&self, ui_field: &'a str) -> &'a str {
        lookup(self.sort_fields, ui_field)
    }

    /// Server name of a UI filter key.
    #[must_use]
    pub fn filter_key<'a>(&self, ui_key: &'a str) -> &'a str {
        lookup(self.filter_keys, ui_key)
    }
}

impl Default for QueryVocabulary {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn lookup<'a>(pairs: &'static [(&'static str, &'static str)], name: &'a str) -> &'a str {
    pairs
        .iter()
        .find(|(ui, _)| *ui == name)
        .map_or(name, |(_, server)| *server)
}

// ---------------------------------------------------------------------------
// TransportQuery
// ---------------------------------------------------------------------------

/// Sort direction token understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    /// Wire token: `"ASC"` or `"DESC"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Parses a wire token, case-insensitively.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side sort column with its direction token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportSort {
    /// Server field name.
    pub field: String,
    /// Direction token.
    pub order: SortOrder,
}

/// A list request in the server's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportQuery {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Optional sort column.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort: Option<TransportSort>,
    /// Named filter parameters, already stringified.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl TransportQuery {
    /// Query-string pairs in deterministic order: `page`, `limit`, sort,
    /// order, then filters by name.
    #[must_use]
    pub fn to_params(&self, vocabulary: &QueryVocabulary) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(4 + self.filters.len());
        params.push(("page".to_string(), self.page.to_string()));
        params.push(("limit".to_string(), self.limit.to_string()));
        if let Some(sort) = &self.sort {
            params.push((vocabulary.sort_param.to_string(), sort.field.clone()));
            params.push((
                vocabulary.order_param.to_string(),
                sort.order.as_str().to_string(),
            ));
        }
        params.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }

    /// Offset of the first row of this page (0-based).
    #[must_use]
    pub fn offset(&self) -> usize {
        let page = self.page.max(1) as usize;
        (page - 1) * self.limit as usize
    }
}

// ---------------------------------------------------------------------------
// compose
// ---------------------------------------------------------------------------

/// Converts a UI [`Query`] into a [`TransportQuery`].
#[must_use]
pub fn compose(query: &Query, vocabulary: &QueryVocabulary) -> TransportQuery {
    let sort = query.sort.as_ref().map(|spec| TransportSort {
        field: vocabulary.sort_field(&spec.field).to_string(),
        order: if spec.descending {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        },
    });

    let filters = query
        .active_filters()
        .into_iter()
        .map(|(key, value)| (vocabulary.filter_key(key).to_string(), value.to_param()))
        .collect();

    TransportQuery {
        page: query.page_index.saturating_add(1),
        limit: query.page_size.max(1),
        sort,
        filters,
    }
}
