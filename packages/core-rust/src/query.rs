//! UI-level query model: pagination, sort, and filters driving a list fetch.
//!
//! A [`Query`] is expressed in the vocabulary of the filter bar and the table
//! header (0-based page index, UI field names). It is turned into the server's
//! vocabulary by [`compose`](crate::compose::compose) and into an equality key
//! by [`QueryFingerprint`](crate::fingerprint::QueryFingerprint).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::traits::Entity;
use crate::types::Scalar;

/// Filter bar contents. `None` models a field that is present but unset
/// (`null`/`undefined` on the UI side).
pub type Filters = HashMap<String, Option<Scalar>>;

/// A single sort column and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    /// UI field name of the sort column.
    pub field: String,
    /// `true` for descending order.
    pub descending: bool,
}

impl SortSpec {
    /// Ascending sort on `field`.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending sort on `field`.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Caller-specified defaults a view starts from and falls back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDefaults {
    /// Rows per page when the view mounts.
    pub page_size: u32,
    /// Sort applied when no explicit sort is selected.
    pub sort: Option<SortSpec>,
}

impl QueryDefaults {
    /// Defaults for an entity: its default sort plus the given page size.
    #[must_use]
    pub fn for_entity<T: Entity>(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            sort: T::default_sort(),
        }
    }
}

/// Pagination, sort, and filter state of one list view.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 0-based page index.
    pub page_index: u32,
    /// Rows per page; always at least 1.
    pub page_size: u32,
    /// Active sort, or `None` for server order.
    pub sort: Option<SortSpec>,
    /// Filter bar contents, possibly holding unset entries.
    pub filters: Filters,
}

impl Query {
    /// First page with the given defaults and no filters.
    #[must_use]
    pub fn new(defaults: &QueryDefaults) -> Self {
        Self {
            page_index: 0,
            page_size: defaults.page_size.max(1),
            sort: defaults.sort.clone(),
            filters: Filters::new(),
        }
    }

    /// Builder-style filter assignment.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.filters.insert(key.into(), Some(value.into()));
        self
    }

    /// Builder-style page index assignment.
    #[must_use]
    pub fn with_page(mut self, page_index: u32) -> Self {
        self.page_index = page_index;
        self
    }

    /// Filters that actually constrain the result, ordered by key.
    ///
    /// Unset entries and empty text are dropped.
    #[must_use]
    pub fn active_filters(&self) -> BTreeMap<&str, &Scalar> {
        self.filters
            .iter()
            .filter_map(|(key, value)| match value {
                Some(v) if !v.is_blank() => Some((key.as_str(), v)),
                _ => None,
            })
            .collect()
    }
}
